//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::products::ProductRepository;
use crate::error::Result;
use crate::filters;
use crate::routes::products::ProductCard;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_PRODUCTS: i64 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Newest products for the featured grid.
    pub products: Vec<ProductCard>,
}

/// Display the home page.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<HomeTemplate> {
    let repo = ProductRepository::new(state.pool());

    let products = repo.list_newest(FEATURED_PRODUCTS).await?;
    let featured = repo.featured_images().await?;

    let cards = products
        .iter()
        .map(|product| {
            let image = featured
                .iter()
                .find(|(id, _)| *id == product.id)
                .map(|(_, url)| url.as_str());
            ProductCard::from_product(product, image)
        })
        .collect();

    Ok(HomeTemplate { products: cards })
}
