//! Read-only reference data.
//!
//! Country list for the selector plus seeded example data per country, used
//! by the SSR pipeline when no explicit context arrives via query params.
//! Shared between server and client halves; never mutated from the request
//! path.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::i18n::Locale;

/// Country reference entry for the selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub code: String,
    pub flag: String,
    pub currency: String,
    pub timezone: String,
    pub locale: Locale,
}

/// Per-country seeded context bags, mirroring the checkout payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleData {
    pub customer_data: Value,
    pub shipping_data: Value,
    pub billing_data: Value,
    pub payment_data: Value,
    pub order_data: Value,
}

static COUNTRIES: Lazy<Vec<Country>> = Lazy::new(|| {
    vec![
        Country {
            id: "AR".into(),
            name: "Argentina".into(),
            code: "AR".into(),
            flag: "🇦🇷".into(),
            currency: "ARS".into(),
            timezone: "America/Argentina/Buenos_Aires".into(),
            locale: Locale::EsAr,
        },
        Country {
            id: "BR".into(),
            name: "Brasil".into(),
            code: "BR".into(),
            flag: "🇧🇷".into(),
            currency: "BRL".into(),
            timezone: "America/Sao_Paulo".into(),
            locale: Locale::PtBr,
        },
    ]
});

/// All countries the selector offers.
pub fn countries() -> &'static [Country] {
    &COUNTRIES
}

/// Look up a country by its two-letter code, case-insensitive.
pub fn country_by_code(code: &str) -> Option<&'static Country> {
    let code = code.to_ascii_uppercase();
    COUNTRIES.iter().find(|country| country.code == code)
}

/// Whether the code belongs to a supported country.
pub fn is_supported_country(code: &str) -> bool {
    country_by_code(code).is_some()
}

/// Seeded example data for a supported country, `None` otherwise.
pub fn example_data_for(code: &str) -> Option<ExampleData> {
    match code.to_ascii_uppercase().as_str() {
        "AR" => Some(argentina_example()),
        "BR" => Some(brazil_example()),
        _ => None,
    }
}

fn argentina_example() -> ExampleData {
    ExampleData {
        customer_data: json!({
            "id": "user-001",
            "email": "juan.perez@example.com",
            "firstName": "Juan",
            "lastName": "Pérez",
            "phone": "+54 11 1234-5678",
        }),
        shipping_data: json!({
            "street": "Av. Corrientes",
            "number": "1234",
            "apartment": "5A",
            "city": "Buenos Aires",
            "state": "CABA",
            "postalCode": "1043",
            "country": "AR",
        }),
        billing_data: json!({
            "documentType": "DNI",
            "documentNumber": "30123456",
            "sameAsShipping": true,
        }),
        payment_data: json!({
            "method": "credit_card",
            "installments": 3,
            "currency": "ARS",
        }),
        order_data: json!({
            "orderId": "ORD-AR-48213",
            "items": 2,
            "total": 45699.90,
            "currency": "ARS",
        }),
    }
}

fn brazil_example() -> ExampleData {
    ExampleData {
        customer_data: json!({
            "id": "user-002",
            "email": "maria.silva@example.com",
            "firstName": "Maria",
            "lastName": "Silva",
            "phone": "+55 11 9876-5432",
        }),
        shipping_data: json!({
            "street": "Rua das Flores",
            "number": "567",
            "city": "São Paulo",
            "state": "SP",
            "postalCode": "01234-567",
            "country": "BR",
        }),
        billing_data: json!({
            "documentType": "CPF",
            "documentNumber": "123.456.789-09",
            "sameAsShipping": true,
        }),
        payment_data: json!({
            "method": "pix",
            "installments": 1,
            "currency": "BRL",
        }),
        order_data: json!({
            "orderId": "ORD-BR-91544",
            "items": 1,
            "total": 899.00,
            "currency": "BRL",
        }),
    }
}
