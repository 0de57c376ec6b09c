use super::handlers::{auth, dashboard, health, orders, products, root, users};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router and document share one registration list: add endpoints here with
/// `.routes(routes!(...))`, grouping handlers that share a path.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(root::root))
        .routes(routes!(root::login_page))
        .routes(routes!(
            auth::session::create_session,
            auth::session::delete_session
        ))
        .routes(routes!(auth::login::login_phone))
        .routes(routes!(auth::login::login_otp))
        .routes(routes!(auth::login::login_resend))
        .routes(routes!(dashboard::dashboard))
        .routes(routes!(products::list_products, products::create_product))
        .routes(routes!(products::update_product, products::delete_product))
        .routes(routes!(orders::list_orders))
        .routes(routes!(orders::update_order_status))
        .routes(routes!(users::list_users))
        .routes(routes!(users::get_user, users::delete_user))
        .routes(routes!(users::update_verification));

    router.get_openapi_mut().tags = Some(
        [
            ("auth", "Phone sign-in and session cookie"),
            ("pages", "Root redirect and guest login page"),
            ("dashboard", "Overview counts and revenue"),
            ("products", "Product catalog"),
            ("orders", "Order management"),
            ("users", "Profiles, shops and inventory"),
            ("health", "Service health"),
        ]
        .into_iter()
        .map(|(name, description)| {
            let mut tag = Tag::new(name);
            tag.description = Some(description.to_string());
            tag
        })
        .collect(),
    );

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated, each "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            optional_str(name),
            optional_str(email.trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}
