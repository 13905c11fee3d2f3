// libs/booking-cell/src/services/catalog.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use tracing::debug;

use shared_backend::ClinicApiClient;

use crate::models::{BookedSlotsResponse, BookingError, Category, Service};

/// Read-only access to categories, services and per-date booked slots.
pub struct CatalogService {
    client: Arc<ClinicApiClient>,
}

impl CatalogService {
    pub fn new(client: Arc<ClinicApiClient>) -> Self {
        Self { client }
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, BookingError> {
        debug!("Fetching service categories");
        let categories = self
            .client
            .request(Method::GET, "/api/categories", None, None)
            .await?;
        Ok(categories)
    }

    pub async fn fetch_services(&self) -> Result<Vec<Service>, BookingError> {
        let services = self
            .client
            .request(Method::GET, "/api/services", None, None)
            .await?;
        Ok(services)
    }

    pub async fn fetch_services_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<Service>, BookingError> {
        debug!("Fetching services for category {}", category_id);
        let path = format!("/api/services?category={}", urlencoding::encode(category_id));
        let services = self.client.request(Method::GET, &path, None, None).await?;
        Ok(services)
    }

    /// Slot labels already taken on `date`. Re-fetched on every date change;
    /// the result only disables buttons, it is never cached.
    pub async fn fetch_booked_slots(&self, date: NaiveDate) -> Result<Vec<String>, BookingError> {
        let path = format!(
            "/api/appointments/booked-slots?date={}",
            date.format("%Y-%m-%d")
        );
        let response: BookedSlotsResponse =
            self.client.request(Method::GET, &path, None, None).await?;
        Ok(response.booked_slots)
    }
}
