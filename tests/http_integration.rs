//! Integration tests for the Konnect client using wiremock
//!
//! These tests drive pagination, resolution, and adoption through the
//! real HTTP client against mocked Konnect endpoints.

use konctl::adopt::Adopter;
use konctl::error::Error;
use konctl::graph::DependencyGraph;
use konctl::identity::Resolver;
use konctl::inventory::RemoteInventory;
use konctl::konnect::http::format_konnect_error;
use konctl::konnect::KonnectClient;
use konctl::labels::NAMESPACE_KEY;
use konctl::loader;
use konctl::pagination::Paginator;
use konctl::resource::{ExternalBlock, LookupFilter, PortalPage, ResourceKind};
use serde_json::{json, Value};
use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "kpat_test-token";

fn client(server: &MockServer) -> KonnectClient {
    KonnectClient::new(&server.uri(), TOKEN).expect("client should build")
}

fn portals(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"id": format!("{prefix}-{i}"), "name": format!("{prefix}-{i}")}))
        .collect()
}

mod pagination_tests {
    use super::*;

    /// Page-number listings stop on the first short page
    #[tokio::test]
    async fn test_short_page_ends_listing() {
        let server = MockServer::start().await;

        for (number, count) in [(1, 50), (2, 50), (3, 20)] {
            Mock::given(method("GET"))
                .and(path("/v3/portals"))
                .and(bearer_token(TOKEN))
                .and(query_param("page[size]", "50"))
                .and(query_param("page[number]", number.to_string()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"data": portals(&format!("p{number}"), count)})),
                )
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/v3/portals"))
            .and(query_param("page[number]", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let items = Paginator::new(&client, ResourceKind::Portal, 50)
            .collect_all()
            .await
            .expect("listing should succeed");

        assert_eq!(items.len(), 120);
        assert_eq!(items[0]["id"], "p1-0");
        assert_eq!(items[119]["id"], "p3-19");
    }

    /// Cursor listings forward the `page[after]` value from `meta.page.next`
    #[tokio::test]
    async fn test_cursor_is_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/event-gateways"))
            .and(query_param("page[after]", "c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "eg-2", "name": "second"}],
                "meta": {"page": {"next": null}}
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/event-gateways"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "eg-1", "name": "first"}],
                "meta": {"page": {"next": "/v1/event-gateways?page[size]=10&page[after]=c2"}}
            })))
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let items = Paginator::new(&client, ResourceKind::EventGateway, 10)
            .collect_all()
            .await
            .expect("listing should succeed");

        let ids: Vec<&str> = items.iter().filter_map(|i| i["id"].as_str()).collect();
        assert_eq!(ids, vec!["eg-1", "eg-2"]);
    }

    /// Name filters are sent as `filter[field][eq]`
    #[tokio::test]
    async fn test_filter_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/control-planes"))
            .and(query_param("filter[name][eq]", "prod cp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "cp-1", "name": "prod cp"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let found = Paginator::new(&client, ResourceKind::ControlPlane, 10)
            .with_filter(LookupFilter::eq("name", "prod cp"))
            .find_first(|item| item["name"] == "prod cp")
            .await
            .expect("lookup should succeed");

        assert_eq!(found.unwrap()["id"], "cp-1");
    }
}

mod error_tests {
    use super::*;

    /// 401 surfaces as a remote error with the page it failed on
    #[tokio::test]
    async fn test_401_is_remote_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/apis"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": 401,
                "title": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = Paginator::new(&client, ResourceKind::Api, 10)
            .collect_all()
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("pagination failed on page 1"), "{message}");
        assert!(message.contains("401"), "{message}");
        assert!(!err.is_configuration());
        match err {
            Error::Remote { source, .. } => {
                assert!(format_konnect_error(&source).contains("Authentication failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Fetch maps 404 to `None`, which adoption reports as not found
    #[tokio::test]
    async fn test_404_fetch_is_not_found() {
        let server = MockServer::start().await;
        let id = "9f5e3a2b-1c4d-4e6f-8a7b-0c1d2e3f4a5b";

        Mock::given(method("GET"))
            .and(path(format!("/v3/portals/{id}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client
            .fetch(ResourceKind::Portal, None, id)
            .await
            .expect("404 is not an error")
            .is_none());

        let err = Adopter::new(&client)
            .adopt(ResourceKind::Portal, id, "team-a")
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }
}

mod adopt_tests {
    use super::*;

    #[tokio::test]
    async fn test_adopt_by_name_merges_labels() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/portals"))
            .and(query_param("filter[name][eq]", "dev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "p-1", "name": "dev", "labels": {"tier": "gold"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v3/portals/p-1"))
            .and(bearer_token(TOKEN))
            .and(body_json(json!({
                "labels": {"tier": "gold", NAMESPACE_KEY: "team-a"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p-1",
                "name": "dev",
                "labels": {"tier": "gold", NAMESPACE_KEY: "team-a"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let result = Adopter::new(&client)
            .adopt(ResourceKind::Portal, "dev", "team-a")
            .await
            .expect("adoption should succeed");

        assert_eq!(result.id, "p-1");
        assert_eq!(result.name, "dev");
        assert_eq!(result.namespace, "team-a");
    }

    #[tokio::test]
    async fn test_already_namespaced_is_not_updated() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/apis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "a-1", "name": "payments", "labels": {NAMESPACE_KEY: "team-b"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let err = Adopter::new(&client)
            .adopt(ResourceKind::Api, "payments", "team-a")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "api \"payments\" already has namespace label \"team-b\""
        );
    }
}

mod resolve_tests {
    use super::*;

    const CONFIG: &str = r#"
portals:
  - ref: dev-portal
    name: dev
    pages:
      - ref: home
        slug: home
      - ref: guides
        slug: guides
"#;

    /// Children are looked up under their resolved parent
    #[tokio::test]
    async fn test_resolve_set_uses_parent_ids() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/portals"))
            .and(query_param("filter[name][eq]", "dev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "p-1", "name": "dev"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/portals/p-1/pages"))
            .and(query_param("filter[slug][eq]", "home"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "pg-1", "slug": "home"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/portals/p-1/pages"))
            .and(query_param("filter[slug][eq]", "guides"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let mut set = loader::parse_str(CONFIG, "inline.yaml").expect("config should parse");
        loader::finalize(&mut set).expect("config should validate");
        let order = DependencyGraph::build(&set).order().expect("no cycles");

        let client = client(&server);
        let resolutions = Resolver::new(&client)
            .resolve_set(&mut set, &order)
            .await
            .expect("resolution should succeed");

        let found: Vec<(String, Option<String>)> = resolutions
            .into_iter()
            .map(|r| (r.resource.reference, r.remote_id))
            .collect();
        assert_eq!(
            found,
            vec![
                ("dev-portal".to_string(), Some("p-1".to_string())),
                ("home".to_string(), Some("pg-1".to_string())),
                ("guides".to_string(), None),
            ]
        );
    }

    /// External children fetched by ID are addressed under their parent
    #[tokio::test]
    async fn test_external_page_fetched_under_portal() {
        let server = MockServer::start().await;
        let portal_id = "3c2d1e0f-4a5b-4c6d-8e7f-9a0b1c2d3e4f";
        let page_id = "7e8f9a0b-1c2d-4e3f-a4b5-c6d7e8f9a0b1";

        Mock::given(method("GET"))
            .and(path(format!("/v3/portals/{portal_id}/pages/{page_id}")))
            .and(bearer_token(TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": page_id,
                "slug": "docs"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut page = PortalPage::new("docs", "dev-portal", "docs");
        page.common.external = Some(ExternalBlock::by_id(page_id));

        let client = client(&server);
        let found = Resolver::new(&client)
            .resolve(&mut page, Some(portal_id))
            .await
            .expect("resolution should succeed");

        assert_eq!(found.as_deref(), Some(page_id));
    }
}
