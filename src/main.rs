use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};

use payroll_portal_backend::config::Config;
use payroll_portal_backend::db;
use payroll_portal_backend::utils::captcha::CaptchaVerifier;
use payroll_portal_backend::utils::mailer::Mailer;
use payroll_portal_backend::utils::realtime::Broadcaster;
use payroll_portal_backend::utils::storage::{self, Storage};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    if config.is_production() && config.recaptcha_secret.is_none() {
        warn!("Running in production without RECAPTCHA_SECRET");
    }

    // Initialize the database pool
    let pool = db::create_pool(&config).await.map_err(|e| {
        error!("Failed to connect to the database: {}", e);
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
    })?;

    let aws_config = storage::load_aws_config().await;
    let storage = Storage::new(aws_sdk_s3::Client::new(&aws_config), &config);
    let mailer = Mailer::new(aws_sdk_sesv2::Client::new(&aws_config), config.email_from.clone());
    let http = reqwest::Client::new();
    let captcha = CaptchaVerifier::new(http.clone(), config.recaptcha_secret.clone());
    let broadcaster = Broadcaster::new(http, config.realtime.clone());

    let bind_address = config.bind_address();
    info!("Starting server at {} ({})", bind_address, config.environment);

    let server_pool = pool.clone();
    let config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(config.clone())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .app_data(web::Data::new(captcha.clone()))
            .app_data(web::Data::new(broadcaster.clone()))
            .configure(payroll_portal_backend::configure_routes)
    })
    .bind(bind_address)?
    .run()
    .await?;

    info!("Server stopped, closing database pool");
    pool.close().await;
    Ok(())
}
