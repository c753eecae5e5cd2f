//! Product listing: filtering, sorting, pagination.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use veltr_core::{CategorySlug, ProductSort};

use super::{CatalogError, Product};

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 12;

/// Raw query string parameters for `GET /api/products`.
///
/// Everything arrives as text so validation errors can name the parameter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A validated listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub text: Option<String>,
    pub category: Option<CategorySlug>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    pub page: usize,
    pub limit: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            text: None,
            category: None,
            min_price: None,
            max_price: None,
            sort: ProductSort::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned alongside a page of products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

/// One window of the filtered product list.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub meta: PageMeta,
}

impl TryFrom<ProductQueryParams> for ProductQuery {
    type Error = CatalogError;

    fn try_from(params: ProductQueryParams) -> Result<Self, Self::Error> {
        let page = parse_positive_integer(params.page.as_deref(), DEFAULT_PAGE, "page")?;
        let limit = parse_positive_integer(params.limit.as_deref(), DEFAULT_LIMIT, "limit")?;
        let min_price = parse_number(params.min_price.as_deref(), "minPrice")?;
        let max_price = parse_number(params.max_price.as_deref(), "maxPrice")?;

        if let (Some(min), Some(max)) = (min_price, max_price)
            && max < min
        {
            return Err(CatalogError::InvalidQuery(
                "maxPrice must be greater than or equal to minPrice".to_string(),
            ));
        }

        let sort = match params.sort.as_deref() {
            None | Some("") => ProductSort::default(),
            Some(raw) => raw.parse().map_err(CatalogError::InvalidQuery)?,
        };

        let text = params
            .q
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let category = params
            .category
            .filter(|c| !c.is_empty())
            .map(CategorySlug::new);

        Ok(Self {
            text,
            category,
            min_price,
            max_price,
            sort,
            page,
            limit,
        })
    }
}

impl ProductQuery {
    fn matches(&self, product: &Product) -> bool {
        if let Some(text) = &self.text
            && !product.name.to_lowercase().contains(text.as_str())
        {
            return false;
        }
        if let Some(category) = &self.category
            && &product.category != category
        {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price.amount() < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price.amount() > max
        {
            return false;
        }
        true
    }

    /// Apply this query to a product list.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> ProductPage {
        let mut items: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();

        // sort_by is stable, equal prices keep catalog order
        match self.sort {
            ProductSort::PriceAsc => items.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => items.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        let total = items.len();
        let pages = total.div_ceil(self.limit).max(1);
        let start = self.page.saturating_sub(1).saturating_mul(self.limit);

        let items = items
            .into_iter()
            .skip(start)
            .take(self.limit)
            .cloned()
            .collect();

        ProductPage {
            items,
            meta: PageMeta {
                page: self.page,
                limit: self.limit,
                total,
                pages,
            },
        }
    }
}

fn parse_positive_integer(
    value: Option<&str>,
    fallback: usize,
    name: &str,
) -> Result<usize, CatalogError> {
    let Some(raw) = value else {
        return Ok(fallback);
    };

    let raw = raw.trim();
    raw.parse::<usize>()
        .ok()
        .or_else(|| {
            // Integral floats such as `2.0` count as integers
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < 9.0e15)
                .map(|f| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounded above
                    let whole = f as usize;
                    whole
                })
        })
        .filter(|n| *n > 0)
        .ok_or_else(|| CatalogError::InvalidQuery(format!("{name} must be a positive integer")))
}

fn parse_number(value: Option<&str>, name: &str) -> Result<Option<Decimal>, CatalogError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    raw.parse::<Decimal>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .and_then(|f| Decimal::try_from(f).ok())
        })
        .map(Some)
        .ok_or_else(|| CatalogError::InvalidQuery(format!("{name} must be a number")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn params(pairs: &[(&str, &str)]) -> ProductQueryParams {
        let mut params = ProductQueryParams::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "q" => params.q = value,
                "category" => params.category = value,
                "minPrice" => params.min_price = value,
                "maxPrice" => params.max_price = value,
                "sort" => params.sort = value,
                "page" => params.page = value,
                "limit" => params.limit = value,
                other => panic!("unknown param {other}"),
            }
        }
        params
    }

    fn query(pairs: &[(&str, &str)]) -> Result<ProductQuery, CatalogError> {
        ProductQuery::try_from(params(pairs))
    }

    fn error_message(pairs: &[(&str, &str)]) -> String {
        query(pairs).unwrap_err().to_string()
    }

    #[test]
    fn test_defaults() {
        let parsed = query(&[]).unwrap();
        assert_eq!(parsed, ProductQuery::default());
        assert_eq!(parsed.page, 1);
        assert_eq!(parsed.limit, 12);
        assert_eq!(parsed.sort, ProductSort::Newest);
    }

    #[test]
    fn test_rejects_bad_pagination() {
        assert_eq!(error_message(&[("page", "0")]), "page must be a positive integer");
        assert_eq!(error_message(&[("limit", "-3")]), "limit must be a positive integer");
        assert_eq!(error_message(&[("limit", "abc")]), "limit must be a positive integer");
        assert_eq!(error_message(&[("page", "")]), "page must be a positive integer");
        assert_eq!(error_message(&[("page", "1.5")]), "page must be a positive integer");
        assert_eq!(error_message(&[("limit", "0.0")]), "limit must be a positive integer");
        assert_eq!(error_message(&[("page", "NaN")]), "page must be a positive integer");
    }

    #[test]
    fn test_integral_floats_are_integers() {
        let parsed = query(&[("page", "2.0"), ("limit", " 6.0 ")]).unwrap();
        assert_eq!(parsed.page, 2);
        assert_eq!(parsed.limit, 6);
    }

    #[test]
    fn test_rejects_bad_prices() {
        assert_eq!(error_message(&[("minPrice", "cheap")]), "minPrice must be a number");
        assert_eq!(
            error_message(&[("minPrice", "500"), ("maxPrice", "100")]),
            "maxPrice must be greater than or equal to minPrice"
        );
    }

    #[test]
    fn test_empty_prices_are_absent() {
        let parsed = query(&[("minPrice", ""), ("maxPrice", "  ")]).unwrap();
        assert_eq!(parsed.min_price, None);
        assert_eq!(parsed.max_price, None);
    }

    #[test]
    fn test_rejects_unknown_sort() {
        assert_eq!(
            error_message(&[("sort", "rating")]),
            "sort must be one of price_asc, price_desc, or newest"
        );
    }

    #[test]
    fn test_text_filter_is_case_insensitive() {
        let catalog = Catalog::seed().unwrap();
        let page = catalog.search(&query(&[("q", "  ECHO ")]).unwrap());
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.items[0].id.as_str(), "veltr-echo-earbuds");
    }

    #[test]
    fn test_category_and_price_filters() {
        let catalog = Catalog::seed().unwrap();
        let page = catalog.search(
            &query(&[("category", "studio"), ("minPrice", "800"), ("maxPrice", "1000")]).unwrap(),
        );
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.items[0].id.as_str(), "veltr-nova-studio");
    }

    #[test]
    fn test_sorting() {
        let catalog = Catalog::seed().unwrap();

        let asc = catalog.search(&query(&[("sort", "price_asc")]).unwrap());
        assert!(asc.items.windows(2).all(|w| w[0].price <= w[1].price));

        let desc = catalog.search(&query(&[("sort", "price_desc")]).unwrap());
        assert!(desc.items.windows(2).all(|w| w[0].price >= w[1].price));

        let newest = catalog.search(&query(&[]).unwrap());
        assert!(
            newest
                .items
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
        assert_eq!(newest.items[0].id.as_str(), "veltr-aero-flagship");
    }

    #[test]
    fn test_windowing() {
        let catalog = Catalog::seed().unwrap();

        for limit in 1..=10 {
            let mut seen = 0;
            let mut page = 1;
            loop {
                let result = catalog.search(&ProductQuery {
                    page,
                    limit,
                    ..ProductQuery::default()
                });
                assert!(result.items.len() <= limit);
                assert_eq!(result.meta.total, 8);
                assert_eq!(result.meta.pages, 8_usize.div_ceil(limit).max(1));
                if result.items.is_empty() {
                    break;
                }
                seen += result.items.len();
                page += 1;
            }
            assert_eq!(seen, 8);
        }
    }

    #[test]
    fn test_empty_result_still_has_one_page() {
        let catalog = Catalog::seed().unwrap();
        let page = catalog.search(&query(&[("q", "theremin")]).unwrap());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let catalog = Catalog::seed().unwrap();
        let page = catalog.search(&query(&[("page", "99")]).unwrap());
        assert!(page.items.is_empty());
        assert_eq!(page.meta.page, 99);
    }
}
