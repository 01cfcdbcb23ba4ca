//! Seed command: insert a small demo catalog.
//!
//! Idempotence is intentionally not attempted; running seed twice inserts
//! the catalog twice. Use a fresh database for demos.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::CommandError;

struct SeedProduct {
    title: &'static str,
    description: &'static str,
    /// Price in cents.
    price_cents: i64,
    variants: &'static [SeedVariant],
}

struct SeedVariant {
    color: &'static str,
    product_type: &'static str,
    tags: &'static [&'static str],
    image_url: &'static str,
}

const CATALOG: &[SeedProduct] = &[
    SeedProduct {
        title: "Canvas Tote",
        description: "Heavyweight canvas tote with reinforced straps.",
        price_cents: 2500,
        variants: &[
            SeedVariant {
                color: "Natural",
                product_type: "bag",
                tags: &["canvas", "everyday"],
                image_url: "/static/images/placeholder.svg",
            },
            SeedVariant {
                color: "Forest",
                product_type: "bag",
                tags: &["canvas"],
                image_url: "/static/images/placeholder.svg",
            },
        ],
    },
    SeedProduct {
        title: "Enamel Mug",
        description: "Campfire-ready enamel mug, 350ml.",
        price_cents: 1800,
        variants: &[SeedVariant {
            color: "Cream",
            product_type: "kitchen",
            tags: &["enamel", "camping"],
            image_url: "/static/images/placeholder.svg",
        }],
    },
    SeedProduct {
        title: "Field Notebook",
        description: "Pocket notebook with dotted pages and a stitched spine.",
        price_cents: 900,
        variants: &[SeedVariant {
            color: "Kraft",
            product_type: "stationery",
            tags: &["paper"],
            image_url: "/static/images/placeholder.svg",
        }],
    },
];

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    tracing::info!("Connecting to storefront database...");
    let pool = super::connect().await?;

    for product in CATALOG {
        seed_product(&pool, product).await?;
        tracing::info!(title = product.title, "seeded product");
    }

    tracing::info!("Seed complete: {} products", CATALOG.len());
    Ok(())
}

async fn seed_product(pool: &PgPool, product: &SeedProduct) -> Result<(), CommandError> {
    let mut tx = pool.begin().await?;

    let (product_id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO products (title, description, price)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(product.title)
    .bind(product.description)
    .bind(Decimal::new(product.price_cents, 2))
    .fetch_one(&mut *tx)
    .await?;

    for variant in product.variants {
        let (variant_id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO product_variants (product_id, color, product_type)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(variant.color)
        .bind(variant.product_type)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO variant_images (variant_id, url, name, size, position)
            VALUES ($1, $2, $3, $4, 0)
            ",
        )
        .bind(variant_id)
        .bind(variant.image_url)
        .bind(format!("{}-{}", product.title, variant.color))
        .bind(0.0_f32)
        .execute(&mut *tx)
        .await?;

        for tag in variant.tags {
            sqlx::query("INSERT INTO variant_tags (variant_id, tag) VALUES ($1, $2)")
                .bind(variant_id)
                .bind(*tag)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}
