use super::*;

#[test]
fn endpoint_url_builds_storefront_graphql_path() {
    let url = StorefrontClient::endpoint_url("carlot-test.myshopify.com", "2024-10").unwrap();
    assert_eq!(
        url,
        "https://carlot-test.myshopify.com/api/2024-10/graphql.json"
    );
}

#[test]
fn endpoint_url_tolerates_trailing_slash() {
    let url = StorefrontClient::endpoint_url("carlot-test.myshopify.com/", "2024-10").unwrap();
    assert_eq!(
        url,
        "https://carlot-test.myshopify.com/api/2024-10/graphql.json"
    );
}

#[test]
fn endpoint_url_rejects_paths() {
    let err = StorefrontClient::endpoint_url("https://carlot-test.myshopify.com", "2024-10")
        .unwrap_err();
    assert!(
        matches!(err, ShopifyError::InvalidEndpoint { .. }),
        "expected InvalidEndpoint, got: {err:?}"
    );
}

#[test]
fn endpoint_url_rejects_empty_domain() {
    assert!(StorefrontClient::endpoint_url("  ", "2024-10").is_err());
}

#[test]
fn with_endpoint_rejects_invalid_url() {
    let err = StorefrontClient::with_endpoint("not a url", "token", 5, 0, 0).unwrap_err();
    assert!(matches!(err, ShopifyError::InvalidEndpoint { .. }));
}

#[test]
fn debug_output_redacts_token() {
    let client = StorefrontClient::new("carlot-test.myshopify.com", "2024-10", "shpat-secret", 5, 0, 0)
        .expect("client");
    let debug = format!("{client:?}");
    assert!(!debug.contains("shpat-secret"));
    assert!(debug.contains("graphql.json"));
}
