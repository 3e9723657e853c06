use actix_web::web::{self, Data};
use actix_web::{HttpResponse, Responder};
use tokio::sync::watch;

use crate::sensor::SensorState;

pub fn new_routes(state: watch::Receiver<SensorState>) -> actix_web::Scope {
    web::scope("/api/sensor")
        .route("", web::get().to(get_sensor_state))
        .app_data(Data::new(state))
}

async fn get_sensor_state(state: Data<watch::Receiver<SensorState>>) -> impl Responder {
    let snapshot = state.borrow().clone();
    HttpResponse::Ok().json(snapshot)
}
