//! # Order Flows Through The Dispatchers
//!
//! ```text
//! principal ──part 1──→ fiduciary ──part 2──→ principal
//! principal ──part 3──→ fiduciary ──part 4──→ beneficiary
//! ```
//!
//! Callers only start the deposit and the redemption; every other step is
//! driven by the receiving node's dispatcher picking the part off the chain.

use std::collections::BTreeMap;

use dta_06_order_protocol::{OrderApi, OrderRequest, OrderSecretRequest};
use dta_07_chain_dispatcher::Dispatched;
use shared_types::{NodeType, Processor};

use super::federation::{eventually, Federation, TestNode};

struct Cast {
    fed: Federation,
    principal: TestNode,
    fiduciary: TestNode,
    beneficiary: TestNode,
}

async fn cast(plugin: &str) -> Cast {
    let fed = Federation::new();
    let fiduciary = fed.node(2, NodeType::MasterFiduciary, "", plugin).await;
    let principal = fed.node(1, NodeType::Principal, &fiduciary.cid, plugin).await;
    let beneficiary = fed.node(3, NodeType::Multi, "", plugin).await;
    Cast {
        fed,
        principal,
        fiduciary,
        beneficiary,
    }
}

fn extension(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Cast {
    fn start_all(&mut self) {
        self.principal.start();
        self.fiduciary.start();
        self.beneficiary.start();
    }

    async fn stop_all(&mut self) {
        self.principal.stop().await.unwrap();
        self.fiduciary.stop().await.unwrap();
        self.beneficiary.stop().await.unwrap();
    }

    /// Start a deposit and wait until the principal holds part 2.
    async fn deposit(&self, beneficiary: Option<String>, pairs: &[(&str, &str)]) -> String {
        let response = self
            .principal
            .service
            .start_deposit(OrderRequest {
                beneficiary_id_document_cid: beneficiary,
                extension: extension(pairs),
            })
            .await
            .unwrap();
        let reference = response.order_reference;
        let book = self.principal.service.book();
        eventually("part 2 at the principal", || book.part2(&reference).is_ok()).await;
        reference
    }

    /// Start the redemption and wait until the beneficiary has the final key.
    async fn redeem(&self, reference: &str, beneficiary: Option<String>) {
        self.principal
            .service
            .start_redemption(OrderSecretRequest {
                order_reference: reference.to_string(),
                beneficiary_id_document_cid: beneficiary,
                ..Default::default()
            })
            .await
            .unwrap();
        let book = self.beneficiary.service.book();
        eventually("final key at the beneficiary", || book.final_key(reference).is_ok()).await;
    }

    fn committed_key(&self, reference: &str) -> String {
        self.principal
            .service
            .book()
            .part2(reference)
            .unwrap()
            .order_part2
            .unwrap()
            .commitment_public_key
    }
}

#[tokio::test]
async fn test_known_at_start_deposit_and_redemption() {
    let mut c = cast("bitcoinwallet").await;
    c.start_all();

    let reference = c.deposit(Some(c.beneficiary.cid.clone()), &[("coin", "0")]).await;
    c.redeem(&reference, None).await;

    let final_key = c.beneficiary.service.book().final_key(&reference).unwrap();
    assert_eq!(final_key.commitment, c.committed_key(&reference));
    assert!(!final_key.extension["address"].is_empty());

    let processors: Vec<Processor> = c.fed.chain.transactions().iter().map(|tx| tx.processor).collect();
    assert_eq!(
        processors,
        vec![
            Processor::FulfillRequest,
            Processor::FulfillResponse,
            Processor::FulfillSecretRequest,
            Processor::FulfillSecretResponse,
        ]
    );
    c.stop_all().await;
}

#[tokio::test]
async fn test_unknown_at_start_beneficiary_named_at_redemption() {
    let mut c = cast("safeguardsecret").await;
    c.start_all();

    let reference = c.deposit(None, &[("plainText", "vault combination")]).await;
    c.redeem(&reference, Some(c.beneficiary.cid.clone())).await;

    let final_key = c.beneficiary.service.book().final_key(&reference).unwrap();
    assert_eq!(final_key.commitment, c.committed_key(&reference));
    assert_eq!(final_key.extension["plainText"], "vault combination");

    let view = c.beneficiary.service.get_order(&reference).await.unwrap();
    assert_eq!(view.beneficiary_type, "unknown_at_start");
    assert_eq!(view.principal_cid, c.principal.cid);
    c.stop_all().await;
}

#[tokio::test]
async fn test_offline_fiduciary_catches_up_on_start() {
    let mut c = cast("safeguardsecret").await;
    c.principal.start();

    let response = c
        .principal
        .service
        .start_deposit(OrderRequest {
            extension: extension(&[("plainText", "x")]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(c.fed.chain.len(), 1);

    // Part 1 is only found by the catch-up search.
    c.fiduciary.start();
    let book = c.principal.service.book();
    let reference = response.order_reference;
    eventually("part 2 at the principal", || book.part2(&reference).is_ok()).await;
    assert_eq!(c.fed.chain.len(), 2);
    c.stop_all().await;
}

#[tokio::test]
async fn test_transport_failures_are_retried() {
    let mut c = cast("safeguardsecret").await;
    c.principal.start();
    let response = c
        .principal
        .service
        .start_deposit(OrderRequest {
            extension: extension(&[("plainText", "x")]),
            ..Default::default()
        })
        .await
        .unwrap();

    // The fiduciary's first two attempts to post part 2 fail.
    c.fed.chain.fail_next_posts(2);
    c.fiduciary.start();

    let book = c.principal.service.book();
    let reference = response.order_reference;
    eventually("part 2 at the principal", || book.part2(&reference).is_ok()).await;
    assert_eq!(c.fed.chain.len(), 2);
    c.stop_all().await;
}

#[tokio::test]
async fn test_redelivered_parts_post_nothing_new() {
    let mut c = cast("safeguardsecret").await;
    c.start_all();
    let reference = c.deposit(Some(c.beneficiary.cid.clone()), &[("plainText", "x")]).await;
    c.redeem(&reference, None).await;

    let committed = c.fed.chain.transactions();
    assert_eq!(committed.len(), 4);
    for tx in &committed {
        c.fed.chain.redeliver(&tx.tx_hash).unwrap();
    }
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    c.stop_all().await;
    assert_eq!(c.fed.chain.len(), 4);

    // Every part is behind its recipient's cursor now.
    for tx in &committed {
        let node = [&c.principal, &c.fiduciary, &c.beneficiary]
            .into_iter()
            .find(|n| n.cid == tx.recipient_id)
            .unwrap();
        assert!(matches!(
            node.dispatcher.dispatch(tx).await.unwrap(),
            Dispatched::Skipped(_)
        ));
        assert!(node.dispatcher.ledger().is_processed(&tx.tx_hash).unwrap());
    }
}

#[tokio::test]
async fn test_restarted_node_resumes_from_its_cursor() {
    let mut c = cast("safeguardsecret").await;
    c.start_all();
    let reference = c.deposit(None, &[("plainText", "x")]).await;
    c.stop_all().await;

    let cursor = c.fiduciary.dispatcher.ledger().cursor().unwrap();
    assert_eq!(cursor, c.fed.chain.transactions()[0].position());

    // A second start replays nothing the first run already handled.
    assert_eq!(c.fiduciary.dispatcher.catch_up().await.unwrap(), 0);
    assert_eq!(c.principal.dispatcher.catch_up().await.unwrap(), 0);
    assert_eq!(c.fed.chain.len(), 2);
    assert!(c.principal.service.book().part2(&reference).is_ok());
}
