use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::OrderStatus;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// Query strings are decoded with serde_urlencoded, which cannot feed numbers
// through `#[serde(flatten)]`, so the paging fields are repeated here.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::Query, http::Uri};

    use super::*;

    #[test]
    fn catalog_query_reads_paging_and_ignores_other_keys() {
        let uri: Uri = "/api/products?page=2&per_page=5&category=fruit&farmer_id=x"
            .parse()
            .expect("uri");
        let Query(pagination) = Query::<Pagination>::try_from_uri(&uri).expect("query");
        assert_eq!(pagination.normalize(), (2, 5, 5));
    }

    #[test]
    fn paging_defaults_and_bounds() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let wide = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(wide.normalize(), (1, 100, 0));
    }
}
