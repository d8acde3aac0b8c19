use crate::database::get_db;
use crate::error::CompletionError;
use actix_service::{self, Transform};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse},
    Error, HttpMessage,
};
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    FutureExt,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, rc::Rc, str::FromStr, sync::OnceLock};

static PUBLIC_KEY: OnceLock<DecodingKey> = OnceLock::new();

#[derive(Debug, Serialize, Deserialize)]
struct UserClaims {
    exp: i64,
    iss: String,
    sub: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub org_id: ObjectId,
    pub name: String,
    pub email: String,
}

#[derive(Debug)]
pub struct UserAuthenticationData {
    pub _id: ObjectId,
    pub org_id: ObjectId,
    pub token: String,
}

pub struct UserAuthenticationMiddleware<S> {
    service: Rc<S>,
}
pub struct UserAuthenticationMiddlewareFactory;

pub type UserAuthentication = Rc<UserAuthenticationData>;

impl User {
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<User>, CompletionError> {
        let db: Database = get_db();
        let collection: Collection<User> = db.collection::<User>("users");

        collection
            .find_one(doc! { "_id": _id }, None)
            .await
            .map_err(|_| CompletionError::Database("COLLECTING_FAILED"))
    }
}

/// Identity issuance lives outside this service; only the public half of the
/// signing key is held here, for verification.
pub fn load_keys() {
    let public_access_file =
        read_to_string("./keys/public_access.pem").expect("LOAD_FAILED_PUBLIC_ACCESS");
    let key = DecodingKey::from_rsa_pem(public_access_file.as_bytes())
        .expect("INVALID_PUBLIC_ACCESS_KEY");
    if PUBLIC_KEY.set(key).is_err() {
        panic!("Keys are already loaded");
    }
}

pub fn verify(token: &str) -> Option<ObjectId> {
    let key = PUBLIC_KEY.get()?;
    let validation = Validation::new(Algorithm::RS256);
    match decode::<UserClaims>(token, key, &validation) {
        Ok(data) => ObjectId::from_str(&data.claims.sub).ok(),
        Err(_) => None,
    }
}

impl<S, B> Service<ServiceRequest> for UserAuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv: Rc<S> = self.service.clone();

        async move {
            let bearer_token: Option<String> = req
                .headers()
                .get("Authorization")
                .and_then(|header| header.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string);

            if let Some(token) = bearer_token {
                if let Some(_id) = verify(&token) {
                    if let Ok(Some(user)) = User::find_by_id(&_id).await {
                        let auth_data: UserAuthenticationData = UserAuthenticationData {
                            _id,
                            org_id: user.org_id,
                            token,
                        };
                        req.extensions_mut()
                            .insert::<UserAuthentication>(Rc::new(auth_data));
                    }
                }
            }
            let res: ServiceResponse<B> = srv.call(req).await?;
            Ok(res)
        }
        .boxed_local()
    }
}
impl<S, B> Transform<S, ServiceRequest> for UserAuthenticationMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = UserAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserAuthenticationMiddleware {
            service: Rc::new(service),
        }))
    }
}
