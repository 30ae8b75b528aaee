/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{web, App, HttpServer};
use reqwest::Url;
use ride_booking_service::{
    common::ledger::InMemoryWalletLedger,
    domain::api,
    environment::{AppConfig, AppState},
    middleware::*,
    outbound::external::{HttpPaymentGateway, HttpRoutingProvider},
    tools::error::AppError,
    tools::logger::setup_tracing,
    tools::prometheus::prometheus_metrics,
};
use std::{env::var, sync::Arc};
use tracing_actix_web::TracingLogger;

pub fn read_dhall_config(config_path: &str) -> Result<AppConfig, String> {
    let config = serde_dhall::from_file(config_path).parse::<AppConfig>();
    match config {
        Ok(config) => Ok(config),
        Err(e) => Err(format!("Error reading config: {}", e)),
    }
}

#[actix_web::main]
async fn start_server() -> std::io::Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall_config/ride_booking_service.dhall".to_string());
    let app_config = read_dhall_config(&dhall_config_path).unwrap_or_else(|err| {
        println!("Dhall Config Reading Error : {}", err);
        std::process::exit(1);
    });

    let _guard = setup_tracing(app_config.logger_cfg);

    let port = app_config.port;
    let workers = app_config.workers;

    let routing_provider = Arc::new(HttpRoutingProvider::new(
        Url::parse(app_config.routing_provider_url.as_str())
            .expect("Failed to parse routing_provider_url."),
    ));
    let payment_gateway = Arc::new(HttpPaymentGateway::new(
        Url::parse(app_config.payment_gateway_url.as_str())
            .expect("Failed to parse payment_gateway_url."),
    ));
    let wallet_ledger = Arc::new(InMemoryWalletLedger::new());

    let app_state = AppState::new(app_config, routing_provider, payment_gateway, wallet_ledger).await;

    let data = web::Data::new(app_state);
    let cleanup_data = data.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _| AppError::UnprocessibleRequest(err.to_string()).into()),
            )
            .wrap(RequestTimeout)
            .wrap(CheckContentLength)
            .wrap(IncomingRequestMetrics)
            .wrap(TracingLogger::<DomainRootSpanBuilder>::new())
            .wrap(prometheus_metrics())
            .configure(api::handler)
    })
    .workers(workers)
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    // No pickup watch may outlive the server.
    for (_, tracker) in cleanup_data.pickup_watches.write().await.drain() {
        tracker.stop_watching();
    }

    Ok(())
}

fn main() {
    start_server().expect("Failed to start the server");
}
