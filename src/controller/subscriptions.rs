use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse};

use serde::Deserialize;
use serde_json::json;

use sqlx::PgPool;

use crate::domain::SubscriptionToken;
use crate::error::{RestError, RestResult};
use crate::model::NewSubscription;
use crate::repo::PgSubscriptionStore;
use crate::service::{CreateOutcome, Notifier, SubscriptionLifecycle};

/// Deserialization wrapper for subscribe requests, sent either as JSON or as a form.
/// Missing fields are reported by validation rather than by the extractor.
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    email: Option<String>,
    city: Option<String>,
    frequency: Option<String>,
}

impl TryInto<NewSubscription> for SubscribeBody {
    type Error = String;

    fn try_into(self) -> Result<NewSubscription, Self::Error> {
        let email = self.email.unwrap_or_default().parse()?;
        let city = self.city.unwrap_or_default().parse()?;
        let frequency = self.frequency.unwrap_or_default().parse()?;

        Ok(NewSubscription {
            email,
            city,
            frequency,
        })
    }
}

type SubscribeRequest = web::Either<web::Json<SubscribeBody>, web::Form<SubscribeBody>>;

fn lifecycle(
    pool: &web::Data<PgPool>,
    notifier: web::Data<dyn Notifier>,
) -> SubscriptionLifecycle<PgSubscriptionStore> {
    SubscriptionLifecycle::new(
        PgSubscriptionStore::new(pool.get_ref().clone()),
        notifier.into_inner(),
    )
}

/// Create endpoint for new subscriptions
#[tracing::instrument(name = "Subscribe", skip_all)]
#[post("/subscribe")]
async fn subscribe(
    pool: web::Data<PgPool>,
    notifier: web::Data<dyn Notifier>,
    body: SubscribeRequest,
) -> RestResult<HttpResponse> {
    let body = match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };
    let new_subscription: NewSubscription = body.try_into().map_err(RestError::BadRequest)?;

    match lifecycle(&pool, notifier)
        .create_subscription(new_subscription)
        .await
    {
        Ok(CreateOutcome::Created(_)) => Ok(HttpResponse::Ok().json(json!({
            "message": "Subscription successful. Confirmation email sent."
        }))),
        Ok(CreateOutcome::AlreadyExists) => Err(RestError::Conflict(
            "Email already subscribed to this city".into(),
        )),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create subscription");
            Err(RestError::InternalError("Failed to create subscription".into()))
        }
    }
}

/// Subscription confirmation endpoint
#[tracing::instrument(name = "Confirm subscription by token", skip_all)]
#[get("/confirm/{token}")]
async fn confirm(
    pool: web::Data<PgPool>,
    notifier: web::Data<dyn Notifier>,
    path: web::Path<(String,)>,
) -> RestResult<HttpResponse> {
    let (token,) = path.into_inner();
    let token = SubscriptionToken::from(token);

    match lifecycle(&pool, notifier).confirm_subscription(&token).await {
        Ok(true) => Ok(HttpResponse::Ok().json(json!({
            "message": "Subscription confirmed successfully"
        }))),
        Ok(false) => Err(RestError::NotFound("Token not found or invalid".into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to confirm subscription");
            Err(RestError::InternalError("Failed to confirm subscription".into()))
        }
    }
}

/// Unsubscribe endpoint
#[tracing::instrument(name = "Unsubscribe by token", skip_all)]
#[get("/unsubscribe/{token}")]
async fn unsubscribe(
    pool: web::Data<PgPool>,
    notifier: web::Data<dyn Notifier>,
    path: web::Path<(String,)>,
) -> RestResult<HttpResponse> {
    let (token,) = path.into_inner();
    let token = SubscriptionToken::from(token);

    match lifecycle(&pool, notifier).unsubscribe(&token).await {
        Ok(true) => Ok(HttpResponse::Ok().json(json!({
            "message": "Unsubscribed successfully"
        }))),
        Ok(false) => Err(RestError::NotFound("Token not found or invalid".into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to unsubscribe");
            Err(RestError::InternalError("Failed to unsubscribe".into()))
        }
    }
}

/// Subscription endpoints, mounted under `/api`
pub fn services() -> impl HttpServiceFactory {
    (subscribe, confirm, unsubscribe)
}
