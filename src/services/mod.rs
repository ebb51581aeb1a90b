//! Business logic services

pub mod boxes;
pub mod bus;
pub mod email;
pub mod notifications;
pub mod records;
pub mod users;

use std::sync::Arc;

use crate::{clock::Clock, config::AppConfig, repository::Store};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub boxes: boxes::BoxesService,
    pub records: records::RecordsService,
    pub notifications: notifications::NotificationsService,
    pub email: email::EmailService,
    pub bus: bus::ChangeBus,
    store: Arc<dyn Store>,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        let bus = bus::ChangeBus::new(config.notifications.channel_capacity);
        let email = email::EmailService::new(config.email.clone());
        let notifications = notifications::NotificationsService::new(
            store.clone(),
            clock.clone(),
            bus.clone(),
            email.clone(),
            config.notifications.clone(),
        );

        Self {
            users: users::UsersService::new(
                store.clone(),
                clock.clone(),
                bus.clone(),
                email.clone(),
                config.auth.clone(),
                config.users.clone(),
            ),
            boxes: boxes::BoxesService::new(store.clone(), clock.clone(), bus.clone()),
            records: records::RecordsService::new(
                store.clone(),
                clock,
                bus.clone(),
                email.clone(),
                notifications.clone(),
                config.borrowing.clone(),
            ),
            notifications,
            email,
            bus,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}
