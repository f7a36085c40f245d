use alumni_portal::{config::Config, mail::SmtpMailer, router, store::Store, Global};

#[tokio::main]
async fn main() -> Result<(), alumni_portal::Error> {
    tracing_subscriber::fmt::init();

    let path =
        std::env::var("ALUMNI_CONFIG").unwrap_or_else(|_| "./data/config.toml".to_owned());
    let config = Config::load(&path)?;
    tracing::info!("loaded config from {path}");

    let store = Store::open(&config.data_dir)?;
    if let Some(admin) = &config.admin {
        store.seed_staff(admin, chrono::Utc::now())?;
    }
    let mailer = SmtpMailer::new(&config.smtp)?;
    let addr = config.server.addr;

    // use an external function here so this won't be in a proc macro
    // for better coding experience, also for tests
    let app = router(Global::new(store, mailer, config));

    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    Ok(())
}
