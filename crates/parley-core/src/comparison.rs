//! Pairwise offer comparison.
//!
//! The user narrows a set of offers to one by repeatedly picking the better of
//! two. Each selection eliminates exactly one offer, so N unique offers take
//! N-1 selections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};
use crate::types::ProductCategory;

/// A supplier's offer as presented for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub delivery_time: String,
    pub terms: String,
    pub summary: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Still provisional (the negotiation may improve it).
    #[serde(default)]
    pub is_potential: bool,
    #[serde(default)]
    pub is_winner: bool,
}

/// State of one comparison tournament.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferComparison {
    remaining: Vec<Offer>,
    current_pair: Option<(Offer, Offer)>,
    winner: Option<Offer>,
    selections: usize,
}

impl OfferComparison {
    /// Start a tournament. Offers are de-duplicated by id, first one kept.
    ///
    /// A single offer wins outright; no offers means nothing to compare.
    pub fn new(offers: impl IntoIterator<Item = Offer>) -> Self {
        let mut remaining: Vec<Offer> = Vec::new();
        for offer in offers {
            if !remaining.iter().any(|o| o.id == offer.id) {
                remaining.push(offer);
            }
        }

        let mut comparison = Self {
            remaining,
            current_pair: None,
            winner: None,
            selections: 0,
        };
        comparison.advance();
        comparison
    }

    /// Offers still in the running (excluding a decided winner).
    pub fn remaining(&self) -> &[Offer] {
        &self.remaining
    }

    /// The two offers currently being compared.
    pub fn current_pair(&self) -> Option<(&Offer, &Offer)> {
        self.current_pair.as_ref().map(|(a, b)| (a, b))
    }

    /// The surviving offer, once decided.
    pub fn winner(&self) -> Option<&Offer> {
        self.winner.as_ref()
    }

    /// Number of selections made so far.
    pub fn selections(&self) -> usize {
        self.selections
    }

    /// Returns true when a winner has been decided.
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Offers not yet eliminated, winner included.
    pub fn contenders(&self) -> usize {
        self.remaining.len() + usize::from(self.winner.is_some())
    }

    /// Keep `selected_id` from the current pair and drop the other one.
    ///
    /// The kept offer goes to the back of the queue and the next pair is the
    /// front two. Returns the winner once one remains.
    pub fn select_winner(&mut self, selected_id: &str) -> Result<Option<&Offer>> {
        let (first, second) = self
            .current_pair
            .take()
            .ok_or_else(|| ParleyError::InvalidInput("No offers left to compare".to_string()))?;

        let selected = if first.id == selected_id {
            first.clone()
        } else if second.id == selected_id {
            second.clone()
        } else {
            let message = format!("Offer {} is not part of the current pair", selected_id);
            self.current_pair = Some((first, second));
            return Err(ParleyError::InvalidInput(message));
        };

        self.remaining.retain(|o| o.id != first.id && o.id != second.id);
        self.remaining.push(selected);
        self.selections += 1;
        self.advance();

        Ok(self.winner.as_ref())
    }

    fn advance(&mut self) {
        match self.remaining.len() {
            0 => self.current_pair = None,
            1 => {
                let mut winner = self.remaining.remove(0);
                winner.is_winner = true;
                self.winner = Some(winner);
                self.current_pair = None;
            }
            _ => {
                self.current_pair = Some((self.remaining[0].clone(), self.remaining[1].clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(id: &str, price: f64) -> Offer {
        Offer {
            id: id.to_string(),
            supplier_id: format!("s-{}", id),
            supplier_name: format!("Supplier {}", id),
            category: ProductCategory::Computers,
            price,
            delivery_time: "2 weeks".to_string(),
            terms: "Net 30".to_string(),
            summary: String::new(),
            timestamp: None,
            is_potential: false,
            is_winner: false,
        }
    }

    #[test]
    fn test_tournament_converges_in_n_minus_one() {
        for n in 2..=7 {
            let offers: Vec<Offer> = (0..n).map(|i| offer(&format!("o{}", i), 100.0 + i as f64)).collect();
            let mut comparison = OfferComparison::new(offers);
            let mut contenders = comparison.contenders();

            while !comparison.is_finished() {
                // Always keep the cheaper offer.
                let (a, b) = comparison.current_pair().unwrap();
                let cheaper = if a.price <= b.price { a.id.clone() } else { b.id.clone() };
                comparison.select_winner(&cheaper).unwrap();

                assert!(comparison.contenders() <= contenders);
                contenders = comparison.contenders();
            }

            assert_eq!(comparison.selections(), n - 1);
            let winner = comparison.winner().unwrap();
            assert_eq!(winner.id, "o0");
            assert!(winner.is_winner);
            assert!(comparison.remaining().is_empty());
            assert!(comparison.current_pair().is_none());
        }
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let comparison = OfferComparison::new(vec![offer("a", 1.0), offer("a", 2.0), offer("b", 3.0)]);
        assert_eq!(comparison.remaining().len(), 2);
        assert_eq!(comparison.remaining()[0].price, 1.0);
    }

    #[test]
    fn test_selection_outside_pair_is_rejected() {
        let mut comparison = OfferComparison::new(vec![offer("a", 1.0), offer("b", 2.0), offer("c", 3.0)]);

        assert!(comparison.select_winner("c").is_err());
        // The pair survives a bad selection.
        let (a, b) = comparison.current_pair().unwrap();
        assert_eq!((a.id.as_str(), b.id.as_str()), ("a", "b"));

        comparison.select_winner("b").unwrap();
        let (a, b) = comparison.current_pair().unwrap();
        assert_eq!((a.id.as_str(), b.id.as_str()), ("c", "b"));
    }

    #[test]
    fn test_degenerate_sizes() {
        let single = OfferComparison::new(vec![offer("only", 1.0)]);
        assert_eq!(single.winner().map(|o| o.id.as_str()), Some("only"));
        assert_eq!(single.selections(), 0);

        let mut empty = OfferComparison::new(Vec::new());
        assert!(empty.current_pair().is_none());
        assert!(empty.winner().is_none());
        assert!(empty.select_winner("x").is_err());
    }
}
