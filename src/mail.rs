use axum::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, Message, Tokio1Executor,
};

use crate::{account::User, config, Error};

const SENDER: &str = "SAC";

/// Something that delivers emails.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Sends a message.
    ///
    /// # Errors
    ///
    /// - Errors if the message was not accepted for delivery.
    async fn send(&self, message: Message) -> Result<(), Error>;
}

/// Delivers emails through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &config::Smtp) -> Result<Self, Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|err| Error::MailDelivery(Box::new(err)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), Error> {
        if let Err(err) = lettre::AsyncTransport::send(&self.transport, message).await {
            tracing::error!("error sending email with smtp: {err}");
            return Err(Error::MailDelivery(Box::new(err)));
        }
        Ok(())
    }
}

/// Builds the account activation email, with an html body
/// and a plain text alternative.
pub fn activation_email(
    smtp_config: &config::Smtp,
    to: &User,
    activation_link: &str,
    resend_link: &str,
) -> Result<Message, Error> {
    let plain = format!(
        "Hi {},\n\n\
        Please click on the link below to activate your account:\n\n\
        {activation_link}\n\n\
        If the link has expired, you can ask for a new one here:\n\n\
        {resend_link}\n",
        to.username,
    );
    let html = format!(
        "<p>Hi {},</p>\
        <p>Please click on the link below to activate your account:</p>\
        <p><a href=\"{activation_link}\">{activation_link}</a></p>\
        <p>If the link has expired, you can ask for a new one \
        <a href=\"{resend_link}\">here</a>.</p>",
        to.username,
    );

    Ok(Message::builder()
        .from(Mailbox::new(
            Some(SENDER.to_owned()),
            smtp_config.address.clone(),
        ))
        .to(Mailbox::new(None, to.email.clone()))
        .subject("[noreply] SAC Account Activation")
        .multipart(MultiPart::alternative_plain_html(plain, html))?)
}
