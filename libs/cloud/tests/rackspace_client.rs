// Integration tests for the REST clients using wiremock.

use std::collections::BTreeMap;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolsync_cloud::rackspace::{http_client, LoadBalancersClient, ServersClient, Session};
use poolsync_cloud::{
    ApiKey, BackendError, ComputeDirectory, Credentials, InstanceStatus, LoadBalancerId,
    LoadBalancerService, NewNode, NodeCondition, NodeId, Region,
};

const TOKEN: &str = "token-abc";

fn credentials() -> Credentials {
    Credentials {
        username: "operator".to_string(),
        api_key: ApiKey::new("secret-key"),
        region: None,
    }
}

fn lb_client(server: &MockServer) -> LoadBalancersClient {
    LoadBalancersClient::new(
        http_client().unwrap(),
        TOKEN,
        &format!("{}/v1.0/123", server.uri()),
    )
    .unwrap()
}

fn lb_body(status: &str) -> serde_json::Value {
    json!({
        "loadBalancer": {
            "id": 42,
            "name": "web-pool",
            "port": 8080,
            "protocol": "HTTP",
            "status": status,
            "nodes": []
        }
    })
}

// ── Identity ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_builds_catalog() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .and(body_json(json!({
            "auth": {
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": "operator",
                    "apiKey": "secret-key"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": {
                "token": {"id": TOKEN, "expires": "2030-01-01T00:00:00Z"},
                "serviceCatalog": [
                    {
                        "name": "cloudServersOpenStack",
                        "type": "compute",
                        "endpoints": [{"region": "LON", "publicURL": format!("{}/v2/123", server.uri())}]
                    },
                    {
                        "name": "cloudLoadBalancers",
                        "type": "rax:load-balancer",
                        "endpoints": [{"region": "LON", "publicURL": format!("{}/v1.0/123", server.uri())}]
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let session = Session::authenticate(&format!("{}/v2.0", server.uri()), &credentials(), false)
        .await
        .unwrap();

    assert!(session.catalog().compute.contains_key(&Region::Lon));
    assert!(session.load_balancers(Region::Lon).is_ok());
    assert!(matches!(
        session.load_balancers(Region::Syd),
        Err(BackendError::NoEndpoint { .. })
    ));
}

#[tokio::test]
async fn test_authenticate_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unable to authenticate user"))
        .mount(&server)
        .await;

    let err = Session::authenticate(&format!("{}/v2.0", server.uri()), &credentials(), false)
        .await
        .unwrap_err();

    assert!(err.is_auth());
}

// ── Servers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_instances_follows_markers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/123/servers/detail"))
        .and(header("X-Auth-Token", TOKEN))
        .and(query_param("marker", "srv-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [
                {
                    "id": "srv-3",
                    "name": "web3",
                    "status": "BUILD",
                    "metadata": {},
                    "addresses": {"private": [{"addr": "10.0.0.3", "version": 4}]}
                }
            ]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/123/servers/detail"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [
                {
                    "id": "srv-1",
                    "name": "web1",
                    "status": "ACTIVE",
                    "metadata": {"MyGroup0": "clb0"},
                    "addresses": {
                        "public": [{"addr": "203.0.113.1", "version": 4}],
                        "private": [
                            {"addr": "10.0.0.1", "version": 4},
                            {"addr": "10.0.0.11", "version": 4}
                        ]
                    }
                },
                {
                    "id": "srv-2",
                    "name": "web2",
                    "status": "ACTIVE",
                    "addresses": {}
                }
            ]
        })))
        .mount(&server)
        .await;

    let endpoints = BTreeMap::from([(Region::Lon, format!("{}/v2/123", server.uri()))]);
    let client = ServersClient::new(http_client().unwrap(), TOKEN, endpoints)
        .unwrap()
        .with_page_size(2);

    let instances = client.list_instances(Region::Lon).await.unwrap();

    assert_eq!(instances.len(), 3);
    assert_eq!(instances[0].status, InstanceStatus::Active);
    assert_eq!(instances[0].private_addresses, vec!["10.0.0.1", "10.0.0.11"]);
    assert_eq!(instances[0].metadata.get("MyGroup0").map(String::as_str), Some("clb0"));
    assert!(instances[1].private_addresses.is_empty());
    assert_eq!(instances[2].status, InstanceStatus::Other("BUILD".to_string()));
}

#[tokio::test]
async fn test_list_instances_unknown_region() {
    let client = ServersClient::new(http_client().unwrap(), TOKEN, BTreeMap::new()).unwrap();
    let err = client.list_instances(Region::Dfw).await.unwrap_err();
    assert!(matches!(err, BackendError::NoEndpoint { .. }));
}

// ── Load balancers ──────────────────────────────────────────────────

#[tokio::test]
async fn test_find_load_balancer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/42"))
        .and(header("X-Auth-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_body("ACTIVE")))
        .mount(&server)
        .await;

    let lb = lb_client(&server)
        .find(LoadBalancerId(42))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(lb.id, LoadBalancerId(42));
    assert_eq!(lb.port, 8080);
    assert!(lb.is_active());
}

#[tokio::test]
async fn test_find_missing_load_balancer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/7"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Load balancer not found",
            "code": 404
        })))
        .mount(&server)
        .await;

    let found = lb_client(&server).find(LoadBalancerId(7)).await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn test_list_add_remove_nodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_body("ACTIVE")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/42/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": [
                {"id": 1, "address": "10.0.0.2", "port": 8080, "condition": "ENABLED", "status": "ONLINE"},
                {"id": 2, "address": "10.0.0.3", "port": 8080, "condition": "DRAINING", "status": "ONLINE"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1.0/123/loadbalancers/42/nodes"))
        .and(body_json(json!({
            "nodes": [
                {"address": "10.0.0.1", "port": 8080, "condition": "ENABLED", "type": "PRIMARY"}
            ]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "nodes": [
                {"id": 3, "address": "10.0.0.1", "port": 8080, "condition": "ENABLED", "status": "ONLINE"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1.0/123/loadbalancers/42/nodes/1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = lb_client(&server);
    let lb = client.find(LoadBalancerId(42)).await.unwrap().unwrap();

    let nodes = client.list_nodes(&lb).await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].condition, NodeCondition::Draining);

    let added = client
        .add_node(&lb, &NewNode::enabled("10.0.0.1", lb.port))
        .await
        .unwrap();
    assert_eq!(added.id, NodeId(3));

    client.remove_node(&lb, NodeId(1)).await.unwrap();
}

#[tokio::test]
async fn test_add_node_rejected_while_immutable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_body("PENDING_UPDATE")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1.0/123/loadbalancers/42/nodes"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string("Load Balancer '42' has a status of 'PENDING_UPDATE'"),
        )
        .mount(&server)
        .await;

    let client = lb_client(&server);
    let lb = client.find(LoadBalancerId(42)).await.unwrap().unwrap();
    assert_eq!(client.status(&lb).await.unwrap(), "PENDING_UPDATE");

    let err = client
        .add_node(&lb, &NewNode::enabled("10.0.0.1", lb.port))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Rejected { status: 422, .. }));
}
