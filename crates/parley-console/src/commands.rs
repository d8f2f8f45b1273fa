//! Console commands.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use futures::StreamExt;
use parley_core::prelude::*;
use parley_core::{dominant_category, group_by_category, status_counts, HistoryFilter};
use parley_negotiate::{SessionController, SessionEvent, SessionPhase};
use parley_sdk::GatewayClient;
use tracing::info;

/// Build a negotiation request from command-line pieces.
pub fn negotiation_request(
    prompt: &[String],
    suppliers: Vec<String>,
    tactics: Vec<String>,
    product: Option<String>,
) -> anyhow::Result<NegotiationRequest> {
    let mut request = NegotiationRequest::new(prompt.join(" "), suppliers).with_tactics(tactics);
    if request.supplier_ids.is_empty() {
        bail!("negotiate needs at least one supplier");
    }
    if let Some(product) = product {
        request = request.with_product(product);
    }
    Ok(request)
}

pub fn history_filter(status: Option<String>, query: &[String]) -> HistoryFilter {
    let mut filter = HistoryFilter::new().with_query(query.join(" "));
    if let Some(status) = status {
        filter = filter.with_status(NegotiationStatus::parse(&status));
    }
    filter
}

pub async fn health(client: &GatewayClient) {
    let healthy = client.check_health().await;
    println!(
        "{} {}",
        client.config().base_url,
        if healthy { "is up" } else { "is unreachable" }
    );
}

pub async fn search(client: &GatewayClient, query: &str) -> anyhow::Result<()> {
    let products = client.search_products(query).await?;
    if products.is_empty() {
        println!("No products match '{}'.", query);
    }
    for product in products {
        let score = product
            .similarity_score
            .map(|s| format!(" ({:.2})", s))
            .unwrap_or_default();
        println!(
            "{:>6}  {}  from {} [{}]{}",
            product.product_id,
            product.product_name,
            product.supplier_display_name(),
            product.supplier_id,
            score
        );
    }
    Ok(())
}

pub async fn history(client: &GatewayClient, filter: HistoryFilter) {
    let sessions = client.list_negotiations().await;
    if sessions.is_empty() {
        println!("No previous negotiations.");
        return;
    }
    let counts = status_counts(&sessions)
        .into_iter()
        .map(|(status, n)| format!("{} {}", n, status))
        .collect::<Vec<_>>()
        .join(", ");
    println!("{} negotiations ({})", sessions.len(), counts);
    for session in filter.apply(&sessions) {
        println!(
            "{:>6}  {:<10}  {}  [{}]  suppliers: {}",
            session.id,
            session.status,
            session.prompt,
            session.tactics.join(", "),
            session.supplier_ids.join(", ")
        );
    }
}

pub async fn open(client: GatewayClient, negotiation_id: &str) -> anyhow::Result<()> {
    let controller = SessionController::new(Arc::new(client))?;
    controller.open_from_history(negotiation_id).await?;
    follow(&controller).await;
    Ok(())
}

pub async fn negotiate(client: GatewayClient, request: NegotiationRequest) -> anyhow::Result<()> {
    let controller = SessionController::new(Arc::new(client))?;
    let session = controller.submit(request).await?;
    println!("Negotiation {} started.", session.id);
    follow(&controller).await;
    Ok(())
}

/// Wait for the session to finish polling, then print every transcript.
async fn follow(controller: &SessionController<GatewayClient>) {
    let mut events = Box::pin(controller.events().stream());

    while matches!(controller.phase().await, SessionPhase::Polling) {
        match tokio::time::timeout(Duration::from_secs(60), events.next()).await {
            Ok(Some(SessionEvent::StatusUpdated(snapshot))) => {
                info!(
                    negotiation_id = %snapshot.negotiation_id,
                    messages = snapshot.total_messages(),
                    "Negotiation in progress"
                );
            }
            Ok(Some(SessionEvent::PhaseChanged { .. })) | Err(_) => {}
            Ok(Some(_)) => {}
            Ok(None) => break,
        }
    }

    let state = controller.snapshot().await;
    if state.phase == SessionPhase::Expired {
        println!("Stopped waiting for the negotiation to finish.");
    }

    let (suppliers, transcripts): (Vec<_>, Vec<_>) =
        controller.transcripts().await.into_iter().unzip();
    let by_id: HashMap<&str, &Vec<ConversationMessage>> = suppliers
        .iter()
        .map(|s| s.id.as_str())
        .zip(transcripts.iter())
        .collect();

    for (category, group) in ordered_groups(&suppliers) {
        println!();
        println!("## {}", category.label());
        for supplier in group {
            println!();
            println!("== {} ==", supplier.display_name);
            let transcript = by_id.get(supplier.id.as_str()).copied();
            if transcript.map_or(true, |t| t.is_empty()) {
                println!("No messages yet.");
            }
            for message in transcript.into_iter().flatten() {
                let speaker = match message.role {
                    Role::Negotiator => "agent",
                    Role::Supplier => "supplier",
                };
                println!(
                    "[{}] {}: {}",
                    message.timestamp.as_deref().unwrap_or("-"),
                    speaker,
                    message.text
                );
            }
        }
    }
}

/// Category groups with the dominant category first, the rest in category order.
fn ordered_groups(
    suppliers: &[SupplierIdentity],
) -> Vec<(ProductCategory, Vec<&SupplierIdentity>)> {
    let dominant = dominant_category(suppliers);
    let mut groups: Vec<_> = group_by_category(suppliers).into_iter().collect();
    groups.sort_by_key(|(category, _)| *category != dominant);
    groups
}
