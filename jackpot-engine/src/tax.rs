use jackpot_core::{Item, Money, TaxPolicy};

/// Items withheld from the winner's payout as the platform fee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxOutcome {
    pub items: Vec<Item>,
    pub value: Money,
}

impl TaxOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i.id == item_id)
    }
}

/// Greedy smallest-first selection aiming for the policy's
/// `[floor_percent, ceiling_percent]` band of `total_value`.
///
/// Not a subset-sum solver: the order and stopping rules are fixed so that
/// the same pot always yields the same tax.
pub fn compute_tax(items: &[Item], total_value: Money, policy: &TaxPolicy) -> TaxOutcome {
    if total_value < policy.min_pot {
        return TaxOutcome::none();
    }

    let mut sorted: Vec<&Item> = items.iter().collect();
    sorted.sort_by_key(|item| item.price);

    // Compared as `sum * 100` against `total * percent` to stay in integers.
    let total = u128::from(total_value.cents());
    let floor = total * u128::from(policy.floor_percent);
    let ceiling = total * u128::from(policy.ceiling_percent);
    let scaled = |m: Money| u128::from(m.cents()) * 100;

    let mut selected: Vec<Item> = Vec::new();
    let mut sum = Money::ZERO;

    for item in sorted {
        if scaled(sum + item.price) > ceiling && !selected.is_empty() {
            break;
        }

        selected.push(item.clone());
        sum += item.price;

        if scaled(sum) >= floor {
            break;
        }
    }

    // One item alone over the ceiling: the pot is too coarse to tax fairly.
    if selected.len() == 1 && scaled(sum) > ceiling {
        return TaxOutcome::none();
    }

    TaxOutcome {
        items: selected,
        value: sum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(prices: &[u64]) -> Vec<Item> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &dollars)| {
                Item::new(format!("item-{}", i), "skin", Money::from_units(dollars), "owner")
            })
            .collect()
    }

    #[test]
    fn test_small_pot_is_untaxed() {
        let pot = items(&[5, 4]);
        let outcome = compute_tax(&pot, Money::from_cents(999), &TaxPolicy::default());
        assert_eq!(outcome, TaxOutcome::none());
    }

    #[test]
    fn test_stops_once_floor_reached() {
        let pot = items(&[94, 1, 1, 1, 1, 1, 1]);
        let outcome = compute_tax(&pot, Money::from_units(100), &TaxPolicy::default());

        // 5 x $1 is exactly 5% of $100
        assert_eq!(outcome.items.len(), 5);
        assert_eq!(outcome.value, Money::from_units(5));
        assert!(!outcome.contains("item-0"));
    }

    #[test]
    fn test_single_oversized_item_is_discarded() {
        let pot = items(&[60, 40]);
        let outcome = compute_tax(&pot, Money::from_units(100), &TaxPolicy::default());
        assert_eq!(outcome, TaxOutcome::none());
    }

    #[test]
    fn test_overshooting_floor_within_ceiling() {
        let pot = items(&[3, 4, 6, 87]);
        let outcome = compute_tax(&pot, Money::from_units(100), &TaxPolicy::default());

        // $3 then $4 reaches $7 >= $5 and stops
        assert_eq!(outcome.value, Money::from_units(7));
        assert_eq!(outcome.items.len(), 2);
    }

    #[test]
    fn test_second_item_over_ceiling_keeps_first() {
        let pot = items(&[2, 9, 89]);
        let outcome = compute_tax(&pot, Money::from_units(100), &TaxPolicy::default());

        // $2 is under the floor, $2 + $9 = $11 would exceed $10
        assert_eq!(outcome.value, Money::from_units(2));
        assert_eq!(outcome.items.len(), 1);
        assert!(outcome.contains("item-0"));
    }

    #[test]
    fn test_equal_prices_keep_input_order() {
        let pot = items(&[1, 1, 1, 1, 1, 1, 94]);
        let outcome = compute_tax(&pot, Money::from_units(100), &TaxPolicy::default());
        let ids: Vec<&str> = outcome.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["item-0", "item-1", "item-2", "item-3", "item-4"]);
    }
}
