use std::time::Duration;

use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::config::ServerConfig;
use crate::grader::Grader;
use crate::routes::{
    RequestTimeout, json_error_handler, post_extract_handler, post_submission_handler,
};

pub fn build_server(server_config: ServerConfig, grader: Grader) -> std::io::Result<Server> {
    let grader = web::Data::new(grader);
    let timeout = web::Data::new(RequestTimeout(
        server_config.request_timeout_secs.map(Duration::from_secs),
    ));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(grader.clone())
            .app_data(timeout.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(middleware::Logger::default())
            .service(post_submission_handler)
            .service(post_extract_handler)
    })
    .bind((
        server_config
            .bind_address
            .unwrap_or("127.0.0.1".to_string()),
        server_config.bind_port.unwrap_or(12345),
    ))?
    .run();

    Ok(server)
}
