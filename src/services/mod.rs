//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod aggregate_service;
pub mod campaign_service;
pub mod content_service;
pub mod dispatch_service;
pub mod mail_transport;
pub mod store_service;
pub mod tracking_service;
