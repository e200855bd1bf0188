use footwear_storefront::{
    config::AppConfig,
    db::{OrmConn, create_pool, orm_from_pool, run_migrations},
    entity::products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Variants},
    models::Variant,
    services::auth_service::hash_password,
};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let orm = orm_from_pool(&pool);
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "shopper", "user@example.com", "user123", "user").await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, phone, role)
        VALUES ($1, $2, $3, $4, '', $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

fn variants(sku_prefix: &str, color: &str, sizes: &[(&str, i32)]) -> Vec<Variant> {
    sizes
        .iter()
        .map(|(size, stock)| Variant {
            color: color.to_string(),
            size: size.to_string(),
            stock: *stock,
            sku: format!("{sku_prefix}-{}-{size}", color.to_uppercase()),
        })
        .collect()
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    let catalog = vec![
        (
            "Stride",
            "Trail Runner",
            "men",
            "running",
            12_999_i64,
            [
                variants("STR-TR", "Red", &[("9", 12), ("10", 8), ("11", 3)]),
                variants("STR-TR", "Blue", &[("9", 6), ("10", 2)]),
            ]
            .concat(),
        ),
        (
            "Stride",
            "City Loafer",
            "women",
            "casual",
            8_999,
            variants("STR-CL", "Black", &[("6", 10), ("7", 10), ("8", 4)]),
        ),
        (
            "Northpeak",
            "Summit Boot",
            "unisex",
            "boots",
            18_950,
            variants("NP-SB", "Brown", &[("8", 1), ("9", 5), ("10", 7)]),
        ),
        (
            "Courtline",
            "Classic Low",
            "unisex",
            "sneakers",
            6_500,
            variants("CL-CL", "White", &[("7", 20), ("8", 20), ("9", 20)]),
        ),
    ];

    for (brand, model_name, gender, category, price, variants) in catalog {
        let exists = Products::find()
            .filter(ProdCol::Brand.eq(brand))
            .filter(ProdCol::ModelName.eq(model_name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            brand: Set(brand.to_string()),
            model_name: Set(model_name.to_string()),
            gender: Set(Some(gender.to_string())),
            category: Set(Some(category.to_string())),
            width: Set(Some("regular".to_string())),
            material: Set(None),
            price: Set(price),
            photo: Set(None),
            variants: Set(Variants(variants)),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
