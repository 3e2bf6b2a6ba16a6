//! HTTP facade over the coordinator.

use crate::model::{Ack, BrokerMap, Readiness, Snapshot};
use crate::orchestrator::Coordinator;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

/// Form body sent by broker clients. A missing port, or a missing body, is the empty id.
#[derive(Debug, Default, Deserialize)]
struct PortForm {
    #[serde(default)]
    port: String,
}

pub(crate) fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/get_server", get(get_server))
        .route("/get_broker_server_ready", get(get_broker_server_ready))
        .route("/init_broker", post(init_broker))
        .route("/done", post(broker_done))
        .route("/simulator/done", post(simulator_done))
        .route("/start", post(start))
        .with_state(coordinator)
}

fn port_of(form: Option<Form<PortForm>>) -> String {
    form.map(|Form(f)| f).unwrap_or_default().port
}

async fn get_server(State(c): State<Arc<Coordinator>>) -> Json<Snapshot> {
    Json(c.snapshot())
}

async fn get_broker_server_ready(State(c): State<Arc<Coordinator>>) -> Json<Readiness> {
    Json(Readiness {
        ready: c.is_ready(),
    })
}

async fn init_broker(
    State(c): State<Arc<Coordinator>>,
    form: Option<Form<PortForm>>,
) -> Json<BrokerMap> {
    Json(c.register_broker(&port_of(form)))
}

async fn broker_done(
    State(c): State<Arc<Coordinator>>,
    form: Option<Form<PortForm>>,
) -> Json<BrokerMap> {
    Json(c.mark_broker_done(&port_of(form)))
}

async fn simulator_done(State(c): State<Arc<Coordinator>>) -> Json<Ack> {
    c.mark_simulator_done();
    Json(Ack::new("done"))
}

async fn start(State(c): State<Arc<Coordinator>>) -> Json<Ack> {
    c.start();
    Json(Ack::new("start"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::Launcher;
    use crate::model::CoordinatorConfig;
    use anyhow::Result;
    use serde_json::Value;

    struct NoopLauncher;

    impl Launcher for NoopLauncher {
        fn launch(&self, _command: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn serve(max: usize) -> (String, Arc<Coordinator>) {
        let cfg = CoordinatorConfig {
            max_broker_count: max,
            ..CoordinatorConfig::default()
        };
        let coordinator = Coordinator::new(cfg, Box::new(NoopLauncher));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&coordinator));
        tokio::spawn(async move { axum::serve(listener, app).await });
        (format!("http://{addr}"), coordinator)
    }

    #[tokio::test]
    async fn broker_lifecycle_over_http() {
        let (base, c) = serve(2).await;
        let client = reqwest::Client::new();

        let ready: Readiness = client
            .get(format!("{base}/get_broker_server_ready"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(!ready.ready);

        for port in ["9001", "9002"] {
            client
                .post(format!("{base}/init_broker"))
                .form(&[("port", port)])
                .send()
                .await
                .unwrap();
        }
        let brokers: Value = client
            .post(format!("{base}/done"))
            .form(&[("port", "9001")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            brokers,
            serde_json::json!({"9001": {"done": true}, "9002": {"done": false}})
        );

        let ready: Readiness = client
            .get(format!("{base}/get_broker_server_ready"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(ready.ready);

        let snap: Value = client
            .get(format!("{base}/get_server"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snap["broker_counts"], 2);
        assert_eq!(snap["rerun_times"], 0);
        assert_eq!(snap["simulator_status"], "Waiting for broker to be ready");
        assert!(snap["uptime"].is_number());
        assert!(snap.get("last_failure").is_none());
        c.shutdown();
    }

    #[tokio::test]
    async fn start_and_simulator_done_acknowledge() {
        let (base, c) = serve(3).await;
        let client = reqwest::Client::new();

        let ack: Ack = client
            .post(format!("{base}/start"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ack.message, "start");

        let ack: Ack = client
            .post(format!("{base}/simulator/done"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ack.message, "done");
        assert_eq!(c.snapshot().simulator_status, "Simulator is done");
        c.shutdown();
    }

    #[tokio::test]
    async fn missing_port_registers_empty_id() {
        let (base, c) = serve(3).await;
        let brokers: Value = reqwest::Client::new()
            .post(format!("{base}/init_broker"))
            .form(&[("other", "x")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(brokers, serde_json::json!({"": {"done": false}}));
        c.shutdown();
    }

    #[tokio::test]
    async fn bodyless_requests_use_empty_id() {
        let (base, c) = serve(3).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/init_broker"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let brokers: Value = resp.json().await.unwrap();
        assert_eq!(brokers, serde_json::json!({"": {"done": false}}));

        let brokers: Value = client
            .post(format!("{base}/done"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(brokers, serde_json::json!({"": {"done": true}}));
        c.shutdown();
    }
}
