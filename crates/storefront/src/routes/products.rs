//! Product catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use tracing::instrument;

use sprig_core::ProductId;

use crate::db::products::ProductRepository;
use crate::db::reviews::ReviewRepository;
use crate::error::AppError;
use crate::filters;
use crate::models::product::{Product, ProductVariant, VariantImage, VariantTag};
use crate::state::AppState;

/// Fallback image for products with no uploaded gallery.
const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.svg";

// =============================================================================
// View Models
// =============================================================================

/// Product card for listing grids.
#[derive(Clone)]
pub struct ProductCard {
    pub id: i32,
    pub title: String,
    pub price: Decimal,
    pub image: String,
}

impl ProductCard {
    pub(crate) fn from_product(product: &Product, image: Option<&str>) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            price: product.price,
            image: image.unwrap_or(PLACEHOLDER_IMAGE).to_string(),
        }
    }
}

/// A variant with its images and tags, for the detail page.
#[derive(Clone)]
pub struct VariantView {
    pub id: i32,
    pub color: String,
    pub product_type: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

/// A review for the detail page.
#[derive(Clone)]
pub struct ReviewView {
    pub rating: i16,
    pub comment: String,
    pub author: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductCard>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub variants: Vec<VariantView>,
    pub reviews: Vec<ReviewView>,
    pub review_count: usize,
    pub average_rating: String,
    pub logged_in: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product listing.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<ProductsIndexTemplate, AppError> {
    let repo = ProductRepository::new(state.pool());

    let products = repo.list().await?;
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

    Ok(ProductsIndexTemplate { products: cards })
}

/// Display a product detail page.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    user: crate::middleware::MaybeUser,
    Path(id): Path<i32>,
) -> Result<ProductShowTemplate, AppError> {
    let product_id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());

    let product = repo
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    let variants = repo.variants_for(product_id).await?;
    let variant_ids: Vec<_> = variants.iter().map(|v| v.id).collect();
    let images = repo.images_for(&variant_ids).await?;
    let tags = repo.tags_for(&variant_ids).await?;

    let reviews_repo = ReviewRepository::new(state.pool());
    let reviews = reviews_repo.list_for_product(product_id).await?;
    let average = reviews_repo.average_rating(product_id).await?;

    Ok(ProductShowTemplate {
        id: product.id.as_i32(),
        title: product.title,
        description: product.description,
        price: product.price,
        variants: variants
            .iter()
            .map(|variant| variant_view(variant, &images, &tags))
            .collect(),
        review_count: reviews.len(),
        reviews: reviews
            .into_iter()
            .map(|review| ReviewView {
                rating: review.rating,
                comment: review.comment,
                author: review.author_email,
            })
            .collect(),
        average_rating: average.map_or_else(String::new, |avg| format!("{avg:.1}")),
        logged_in: user.0.is_some(),
    })
}

fn variant_view(
    variant: &ProductVariant,
    images: &[VariantImage],
    tags: &[VariantTag],
) -> VariantView {
    VariantView {
        id: variant.id.as_i32(),
        color: variant.color.clone(),
        product_type: variant.product_type.clone(),
        images: images
            .iter()
            .filter(|img| img.variant_id == variant.id)
            .map(|img| img.url.clone())
            .collect(),
        tags: tags
            .iter()
            .filter(|tag| tag.variant_id == variant.id)
            .map(|tag| tag.tag.clone())
            .collect(),
    }
}
