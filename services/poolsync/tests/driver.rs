// Exit codes and log output of a full one-shot run against a mocked API.

use std::fs;
use std::path::Path;

use clap::Parser;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolsync::cli::SyncCli;
use poolsync::driver::{exit_code, run_sync};

const CREDENTIALS: &str = "[rackspace_cloud]\nusername = operator\napi_key = secret-key\n";

struct Fixture {
    server: MockServer,
    dir: TempDir,
}

impl Fixture {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("credentials"), CREDENTIALS).unwrap();
        fs::create_dir(dir.path().join("logs")).unwrap();
        Self { server, dir }
    }

    fn cli(&self) -> SyncCli {
        self.cli_with(&self.dir.path().join("credentials"), &self.dir.path().join("logs"))
    }

    fn cli_with(&self, credfile: &Path, logpath: &Path) -> SyncCli {
        let identity = format!("{}/v2.0", self.server.uri());

        let args = vec![
            "clb-sync".to_string(),
            "-i".to_string(),
            "42".to_string(),
            "-c".to_string(),
            credfile.display().to_string(),
            "-p".to_string(),
            logpath.display().to_string(),
            "--identity-url".to_string(),
            identity,
            "--poll-interval".to_string(),
            "0".to_string(),
        ];
        SyncCli::try_parse_from(args).unwrap()
    }

    fn log_contents(&self) -> String {
        fs::read_to_string(self.dir.path().join("logs").join("clb-sync.log")).unwrap()
    }

    async fn mount_identity(&self) {
        let uri = self.server.uri();
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": {
                    "token": {"id": "token-abc", "expires": "2030-01-01T00:00:00Z"},
                    "serviceCatalog": [
                        {
                            "name": "cloudServersOpenStack",
                            "type": "compute",
                            "endpoints": [{"region": "LON", "publicURL": format!("{uri}/v2/123")}]
                        },
                        {
                            "name": "cloudLoadBalancers",
                            "type": "rax:load-balancer",
                            "endpoints": [{"region": "LON", "publicURL": format!("{uri}/v1.0/123")}]
                        }
                    ]
                }
            })))
            .mount(&self.server)
            .await;
    }

    async fn mount_servers(&self, servers: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v2/123/servers/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "servers": servers })))
            .mount(&self.server)
            .await;
    }

    async fn mount_load_balancer(&self, nodes: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v1.0/123/loadbalancers/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "loadBalancer": {"id": 42, "name": "web-pool", "port": 80, "status": "ACTIVE"}
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1.0/123/loadbalancers/42/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": nodes })))
            .mount(&self.server)
            .await;
    }
}

fn tagged_server(id: &str, address: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": id,
        "status": "ACTIVE",
        "metadata": {"MyGroup0": "clb0"},
        "addresses": {"private": [{"addr": address, "version": 4}]}
    })
}

fn exit_of(result: anyhow::Result<poolsync::CycleReport>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => exit_code(&e),
    }
}

#[tokio::test]
async fn test_converged_run_exits_zero() {
    let fx = Fixture::start().await;
    fx.mount_identity().await;
    fx.mount_servers(json!([tagged_server("web-1", "10.0.0.1")])).await;
    fx.mount_load_balancer(json!([
        {"id": 1, "address": "10.0.0.1", "port": 80, "condition": "ENABLED"}
    ]))
    .await;

    let report = run_sync(&fx.cli()).await.unwrap();

    assert!(report.was_converged());
    assert!(fx.dir.path().join("logs").join("clb-sync.log").is_file());
}

#[tokio::test]
async fn test_run_adds_and_removes_nodes() {
    let fx = Fixture::start().await;
    fx.mount_identity().await;
    fx.mount_servers(json!([tagged_server("web-1", "10.0.0.1")])).await;
    fx.mount_load_balancer(json!([
        {"id": 3, "address": "10.0.0.3", "port": 80, "condition": "ENABLED"}
    ]))
    .await;

    Mock::given(method("POST"))
        .and(path("/v1.0/123/loadbalancers/42/nodes"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "nodes": [{"id": 4, "address": "10.0.0.1", "port": 80, "condition": "ENABLED"}]
        })))
        .expect(1)
        .mount(&fx.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1.0/123/loadbalancers/42/nodes/3"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&fx.server)
        .await;

    let report = run_sync(&fx.cli()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.applied.added, vec!["10.0.0.1"]);
    assert_eq!(report.applied.removed, vec!["10.0.0.3"]);

    let log = fx.log_contents();
    assert!(log.contains("New nodes to add to load balancer"));
    assert!(log.contains("Old nodes to remove from load balancer"));
}

#[tokio::test]
async fn test_missing_credentials_exits_two() {
    let fx = Fixture::start().await;
    let missing = fx.dir.path().join("absent");

    let code = exit_of(run_sync(&fx.cli_with(&missing, &fx.dir.path().join("logs"))).await);
    assert_eq!(code, 2);
}

#[tokio::test]
async fn test_unwritable_log_path_exits_one() {
    let fx = Fixture::start().await;
    let not_a_dir = fx.dir.path().join("credentials");

    let code = exit_of(run_sync(&fx.cli_with(&fx.dir.path().join("credentials"), &not_a_dir)).await);
    assert_eq!(code, 1);
}

#[tokio::test]
async fn test_rejected_credentials_exit_one() {
    let fx = Fixture::start().await;
    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unable to authenticate user"))
        .mount(&fx.server)
        .await;

    let code = exit_of(run_sync(&fx.cli()).await);
    assert_eq!(code, 1);
    assert!(fx.log_contents().contains("authentication failed"));
}

#[tokio::test]
async fn test_no_instances_exits_three() {
    let fx = Fixture::start().await;
    fx.mount_identity().await;
    fx.mount_servers(json!([])).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fx.server)
        .await;

    let code = exit_of(run_sync(&fx.cli()).await);
    assert_eq!(code, 3);
}

#[tokio::test]
async fn test_missing_load_balancer_exits_four() {
    let fx = Fixture::start().await;
    fx.mount_identity().await;
    fx.mount_servers(json!([tagged_server("web-1", "10.0.0.1")])).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/123/loadbalancers/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Load balancer not found",
            "code": 404
        })))
        .mount(&fx.server)
        .await;

    let code = exit_of(run_sync(&fx.cli()).await);
    assert_eq!(code, 4);
}

#[tokio::test]
async fn test_rejected_mutation_exits_one() {
    let fx = Fixture::start().await;
    fx.mount_identity().await;
    fx.mount_servers(json!([tagged_server("web-1", "10.0.0.1")])).await;
    fx.mount_load_balancer(json!([])).await;

    Mock::given(method("POST"))
        .and(path("/v1.0/123/loadbalancers/42/nodes"))
        .respond_with(ResponseTemplate::new(422).set_body_string("immutable"))
        .mount(&fx.server)
        .await;

    let code = exit_of(run_sync(&fx.cli()).await);
    assert_eq!(code, 1);
}
