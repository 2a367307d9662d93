use url::Url;

use crate::client::{Email, EmailClient};
use crate::domain::{EmailAddress, Frequency};
use crate::model::{Subscription, WeatherSnapshot};

/// Transactional notifications sent to subscribers.
///
/// Every method is fire-and-forget: implementations log delivery failures and never
/// report them, so callers cannot assume a message was delivered.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Ask a new subscriber to confirm their subscription
    async fn send_confirmation(&self, subscription: &Subscription);

    /// Greet a subscriber once their subscription is confirmed
    async fn send_welcome(&self, subscription: &Subscription);

    /// Deliver current conditions for the subscribed city
    async fn send_update(&self, subscription: &Subscription, weather: &WeatherSnapshot);

    /// Acknowledge an unsubscribe; the subscription record no longer exists
    async fn send_goodbye(&self, email: &str, city: &str);
}

/// Notifier rendering emails and sending them through the email API
#[derive(Debug)]
pub struct EmailNotifier {
    client: EmailClient,
    base_url: Url,
}

impl EmailNotifier {
    /// `base_url` is the public address the confirm/unsubscribe links point at
    pub fn new(client: EmailClient, base_url: Url) -> Self {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    fn confirmation_link(&self, subscription: &Subscription) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("api/confirm/{}", subscription.token))
    }

    fn unsubscribe_link(&self, subscription: &Subscription) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("api/unsubscribe/{}", subscription.token))
    }

    async fn deliver(&self, recipient: &str, kind: &str, render: impl FnOnce(EmailAddress) -> Email) {
        let recipient = match recipient.parse::<EmailAddress>() {
            Ok(recipient) => recipient,
            Err(e) => {
                tracing::error!(recipient, kind, error = %e, "Refusing to send email to invalid address");
                return;
            }
        };
        let email = render(recipient);

        match self.client.send(&email).await {
            Ok(()) => tracing::info!(recipient = %email.recipient, kind, "Email sent"),
            Err(e) => {
                tracing::error!(recipient = %email.recipient, kind, error = %e, "Failed to send email")
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    #[tracing::instrument(name = "Send confirmation email", skip(self, subscription), fields(city = %subscription.city))]
    async fn send_confirmation(&self, subscription: &Subscription) {
        let link = match self.confirmation_link(subscription) {
            Ok(link) => link,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build confirmation link");
                return;
            }
        };
        tracing::debug!(%link, "Confirmation link");

        self.deliver(&subscription.email, "confirmation", |recipient| {
            confirmation_email(recipient, subscription, &link)
        })
        .await;
    }

    #[tracing::instrument(name = "Send welcome email", skip(self, subscription), fields(city = %subscription.city))]
    async fn send_welcome(&self, subscription: &Subscription) {
        let link = match self.unsubscribe_link(subscription) {
            Ok(link) => link,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build unsubscribe link");
                return;
            }
        };

        self.deliver(&subscription.email, "welcome", |recipient| {
            welcome_email(recipient, subscription, &link)
        })
        .await;
    }

    #[tracing::instrument(name = "Send weather update email", skip(self, subscription, weather), fields(city = %subscription.city))]
    async fn send_update(&self, subscription: &Subscription, weather: &WeatherSnapshot) {
        let link = match self.unsubscribe_link(subscription) {
            Ok(link) => link,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build unsubscribe link");
                return;
            }
        };

        self.deliver(&subscription.email, "update", |recipient| {
            update_email(recipient, subscription, weather, &link)
        })
        .await;
    }

    #[tracing::instrument(name = "Send goodbye email", skip(self))]
    async fn send_goodbye(&self, email: &str, city: &str) {
        self.deliver(email, "goodbye", |recipient| goodbye_email(recipient, city))
            .await;
    }
}

fn cadence(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Hourly => "every hour",
        Frequency::Daily => "every day",
    }
}

fn confirmation_email(recipient: EmailAddress, subscription: &Subscription, link: &Url) -> Email {
    let subject = "Confirm your weather forecast subscription".to_string();
    let html_body = format!(
        "<p>Hello,</p>\
         <p>Please confirm your weather forecast subscription for {city}.<br>\
         Updates will arrive {cadence}.</p>\
         <p><a href=\"{link}\">Confirm subscription</a></p>\
         <p>If you did not request this subscription, just ignore this email.</p>",
        city = subscription.city,
        cadence = cadence(subscription.frequency),
        link = link,
    );
    let text_body = format!(
        "Hello,\n\nPlease confirm your weather forecast subscription for {city}.\n\
         Updates will arrive {cadence}.\n\nTo confirm, visit this web page: {link}\n\n\
         If you did not request this subscription, just ignore this email.",
        city = subscription.city,
        cadence = cadence(subscription.frequency),
        link = link,
    );

    Email {
        recipient,
        subject,
        html_body,
        text_body,
    }
}

fn welcome_email(recipient: EmailAddress, subscription: &Subscription, link: &Url) -> Email {
    let subject = "Weather forecast subscription confirmed".to_string();
    let html_body = format!(
        "<p>Hello,</p>\
         <p>Your weather forecast subscription for {city} is confirmed. \
         You will receive updates {cadence}.</p>\
         <p>To unsubscribe, use this link: <a href=\"{link}\">Unsubscribe</a></p>\
         <p>Thank you for using our service!</p>",
        city = subscription.city,
        cadence = cadence(subscription.frequency),
        link = link,
    );
    let text_body = format!(
        "Hello,\n\nYour weather forecast subscription for {city} is confirmed. \
         You will receive updates {cadence}.\n\nTo unsubscribe, visit: {link}\n\n\
         Thank you for using our service!",
        city = subscription.city,
        cadence = cadence(subscription.frequency),
        link = link,
    );

    Email {
        recipient,
        subject,
        html_body,
        text_body,
    }
}

fn update_email(
    recipient: EmailAddress,
    subscription: &Subscription,
    weather: &WeatherSnapshot,
    link: &Url,
) -> Email {
    let subject = format!("Weather forecast for {}", subscription.city);
    let html_body = format!(
        "<p>Hello,</p>\
         <p>Current weather in {city}:<br>\
         Temperature: {temperature}°C<br>\
         Humidity: {humidity}%<br>\
         Description: {description}</p>\
         <p>To unsubscribe, use this link: <a href=\"{link}\">Unsubscribe</a></p>",
        city = subscription.city,
        temperature = weather.temperature,
        humidity = weather.humidity,
        description = weather.description,
        link = link,
    );
    let text_body = format!(
        "Hello,\n\nCurrent weather in {city}:\n\
         Temperature: {temperature}°C\n\
         Humidity: {humidity}%\n\
         Description: {description}\n\nTo unsubscribe, visit: {link}",
        city = subscription.city,
        temperature = weather.temperature,
        humidity = weather.humidity,
        description = weather.description,
        link = link,
    );

    Email {
        recipient,
        subject,
        html_body,
        text_body,
    }
}

fn goodbye_email(recipient: EmailAddress, city: &str) -> Email {
    let subject = "You have unsubscribed from the weather forecast".to_string();
    let html_body = format!(
        "<p>Hello,</p>\
         <p>You have successfully unsubscribed from the weather forecast for {city}.</p>\
         <p>Thank you for using our service! We will be glad to see you again.</p>",
    );
    let text_body = format!(
        "Hello,\n\nYou have successfully unsubscribed from the weather forecast for {city}.\n\n\
         Thank you for using our service! We will be glad to see you again.",
    );

    Email {
        recipient,
        subject,
        html_body,
        text_body,
    }
}
