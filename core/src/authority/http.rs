use super::SignalAuthority;
use crate::prelude::{ControlError, ControlResult, Credential, Direction, Junction};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// Posts `junction` / `direction` query parameters to the authority endpoint.
pub struct HttpSignalAuthority {
    client: Client,
    override_url: String,
}

impl HttpSignalAuthority {
    pub fn new(override_url: impl Into<String>, timeout: Duration) -> ControlResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            override_url: override_url.into(),
        })
    }
}

#[async_trait]
impl SignalAuthority for HttpSignalAuthority {
    async fn notify(
        &self,
        junction: &Junction,
        direction: Direction,
        credential: Option<&Credential>,
    ) -> ControlResult<()> {
        let mut request = self.client.post(&self.override_url).query(&[
            ("junction", junction.authority_key()),
            ("direction", direction.as_str()),
        ]);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.token());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::Transport(format!(
                "signal authority returned {}",
                status
            )));
        }
        debug!("[{}] authority acknowledged {}", junction.id, direction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::mpsc;
    use warp::http::StatusCode;
    use warp::Filter;

    type Received = (HashMap<String, String>, Option<String>);

    fn authority_endpoint(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Received>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let route = warp::post()
            .and(warp::path("junction_signal_status"))
            .and(warp::path::end())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::header::optional::<String>("authorization"))
            .map(move |query, authorization| {
                let _ = tx.send((query, authorization));
                warp::reply::with_status("", status)
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        (format!("http://{}/junction_signal_status", addr), rx)
    }

    fn junction() -> Junction {
        Junction {
            authority_alias: Some("normal_01".into()),
            ..Junction::new("Junction 01", "01_")
        }
    }

    #[tokio::test]
    async fn advance_posts_junction_and_direction_without_auth() {
        let (url, mut received) = authority_endpoint(StatusCode::OK);
        let authority = HttpSignalAuthority::new(url, Duration::from_secs(2)).unwrap();

        authority
            .notify(&junction(), Direction::East, None)
            .await
            .unwrap();

        let (query, authorization) = received.recv().await.unwrap();
        assert_eq!(query.get("junction").map(String::as_str), Some("normal_01"));
        assert_eq!(query.get("direction").map(String::as_str), Some("east"));
        assert_eq!(authorization, None);
    }

    #[tokio::test]
    async fn override_attaches_bearer_token() {
        let (url, mut received) = authority_endpoint(StatusCode::OK);
        let authority = HttpSignalAuthority::new(url, Duration::from_secs(2)).unwrap();

        authority
            .notify(&junction(), Direction::West, Some(&Credential::bearer("t")))
            .await
            .unwrap();

        let (query, authorization) = received.recv().await.unwrap();
        assert_eq!(query.get("direction").map(String::as_str), Some("west"));
        assert_eq!(authorization.as_deref(), Some("Bearer t"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let (url, mut received) = authority_endpoint(StatusCode::SERVICE_UNAVAILABLE);
        let authority = HttpSignalAuthority::new(url, Duration::from_secs(2)).unwrap();

        let err = authority
            .notify(&junction(), Direction::North, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Transport(_)));
        assert!(received.recv().await.is_some());
    }
}
