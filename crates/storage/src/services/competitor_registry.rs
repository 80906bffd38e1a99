use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::models::{Competitor, CompetitorId};

/// Outcome of registering a competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Inserted,
    Updated,
    Unchanged,
}

/// Per-rally lookup from competitor identity to display metadata.
///
/// Keeps a secondary index on car number so the "unique within a rally" rule
/// is enforced at registration time rather than discovered while ranking.
#[derive(Debug, Clone, Default)]
pub struct CompetitorRegistry {
    competitors: BTreeMap<CompetitorId, Competitor>,
    car_numbers: BTreeMap<u32, CompetitorId>,
}

impl CompetitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert. Fails when the car number is held by someone else.
    pub fn register(&mut self, competitor: Competitor) -> EngineResult<RegistryChange> {
        if let Some(holder) = self.car_numbers.get(&competitor.car_number)
            && holder != &competitor.competitor_id
        {
            return Err(EngineError::DuplicateCarNumber {
                car_number: competitor.car_number,
                holder: holder.clone(),
            });
        }

        match self.competitors.get(&competitor.competitor_id) {
            Some(existing) if existing == &competitor => Ok(RegistryChange::Unchanged),
            Some(existing) => {
                self.car_numbers.remove(&existing.car_number);
                self.car_numbers
                    .insert(competitor.car_number, competitor.competitor_id.clone());
                self.competitors
                    .insert(competitor.competitor_id.clone(), competitor);
                Ok(RegistryChange::Updated)
            }
            None => {
                self.car_numbers
                    .insert(competitor.car_number, competitor.competitor_id.clone());
                self.competitors
                    .insert(competitor.competitor_id.clone(), competitor);
                Ok(RegistryChange::Inserted)
            }
        }
    }

    pub fn get(&self, competitor_id: &CompetitorId) -> Option<&Competitor> {
        self.competitors.get(competitor_id)
    }

    pub fn contains(&self, competitor_id: &CompetitorId) -> bool {
        self.competitors.contains_key(competitor_id)
    }

    pub fn by_car_number(&self, car_number: u32) -> Option<&Competitor> {
        self.car_numbers
            .get(&car_number)
            .and_then(|id| self.competitors.get(id))
    }

    /// Competitors in ascending competitor id order.
    pub fn iter(&self) -> impl Iterator<Item = &Competitor> {
        self.competitors.values()
    }

    pub fn len(&self) -> usize {
        self.competitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.competitors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitor(id: &str, car_number: u32) -> Competitor {
        Competitor {
            competitor_id: CompetitorId::from(id),
            display_name: format!("Driver {id}"),
            co_driver_name: None,
            nationality: "FIN".to_string(),
            car_number,
            team_id: None,
            car_id: None,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = CompetitorRegistry::new();
        assert_eq!(registry.register(competitor("a", 1)), Ok(RegistryChange::Inserted));
        assert_eq!(registry.register(competitor("a", 1)), Ok(RegistryChange::Unchanged));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_moves_car_number_index() {
        let mut registry = CompetitorRegistry::new();
        registry.register(competitor("a", 1)).unwrap();
        assert_eq!(registry.register(competitor("a", 7)), Ok(RegistryChange::Updated));

        assert!(registry.by_car_number(1).is_none());
        assert_eq!(
            registry.by_car_number(7).map(|c| c.competitor_id.as_str()),
            Some("a")
        );
        // The freed number can now be taken by another crew.
        assert_eq!(registry.register(competitor("b", 1)), Ok(RegistryChange::Inserted));
    }

    #[test]
    fn test_duplicate_car_number_rejected() {
        let mut registry = CompetitorRegistry::new();
        registry.register(competitor("a", 1)).unwrap();

        assert_eq!(
            registry.register(competitor("b", 1)),
            Err(EngineError::DuplicateCarNumber {
                car_number: 1,
                holder: CompetitorId::from("a"),
            })
        );
        assert!(!registry.contains(&CompetitorId::from("b")));
    }
}
