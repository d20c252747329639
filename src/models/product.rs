use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::products;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = products)]
#[diesel(belongs_to(crate::models::category::Category))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub description: String,
    pub availability: bool,
    pub category_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub description: String,
    pub availability: bool,
    pub category_id: Uuid,
}
