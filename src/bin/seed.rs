use farm_market_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::Role,
    middleware::auth::issue_token,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let secret = std::env::var("JWT_SECRET")?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "Market Admin", Role::Admin).await?;
    let farmer_id = ensure_user(&pool, "farmer@example.com", "Asha Farms", Role::Farmer).await?;
    let customer_id =
        ensure_user(&pool, "customer@example.com", "Ravi Kumar", Role::Customer).await?;
    ensure_default_address(&pool, customer_id).await?;
    seed_products(&pool, farmer_id).await?;

    let ttl = chrono::Duration::days(7);
    for (label, id, role) in [
        ("admin", admin_id, Role::Admin),
        ("farmer", farmer_id, Role::Farmer),
        ("customer", customer_id, Role::Customer),
    ] {
        let token = issue_token(id, role, &secret, ttl)?;
        println!("{label:<8} {id}\n         Bearer {token}");
    }

    println!("Seed completed");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, full_name, phone, role)
        VALUES ($1, $2, $3, '9000000000', $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_default_address(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<()> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT default_address_id FROM users WHERE id = $1 AND default_address_id IS NOT NULL")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Ok(());
    }

    let address_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO addresses (id, user_id, address_line, state, district, pincode)
        VALUES ($1, $2, '12 Market Road', 'Karnataka', 'Mysuru', '570001')
        "#,
    )
    .bind(address_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    sqlx::query("UPDATE users SET default_address_id = $2 WHERE id = $1")
        .bind(user_id)
        .bind(address_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool, farmer_id: Uuid) -> anyhow::Result<()> {
    // (name, category, price per bundle, discount %, stock in units, units per bundle)
    let products = [
        ("Shimla Apples", "fruits", Decimal::new(12000, 2), Some(15), 100, 5),
        ("Nagpur Oranges", "fruits", Decimal::new(9000, 2), None, 60, 6),
        ("Country Tomatoes", "vegetables", Decimal::new(4000, 2), None, 200, 10),
        ("Farm Eggs", "dairy", Decimal::new(7800, 2), Some(5), 120, 12),
    ];

    for (name, category, price, discount, stock, bundle_size) in products {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, farmer_id, name, category, price, discount_percent, stock, bundle_size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(farmer_id)
        .bind(name)
        .bind(category)
        .bind(price)
        .bind(discount)
        .bind(stock)
        .bind(bundle_size)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
