//! Ordered rule tables for generated text and alerts
//!
//! A [`RuleTable`] is a list of `(predicate, output)` pairs evaluated in
//! priority order. Cluster characteristics, session group notes, recovery
//! recommendations and fatigue alerts are expressed this way. ACWR guidance is
//! a fixed (status, trend) lookup in [`crate::acwr::recommendation`].

type Predicate<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;
type Producer<C, O> = Box<dyn Fn(&C) -> O + Send + Sync>;

/// Single named rule
pub struct Rule<C, O> {
    name: &'static str,
    predicate: Predicate<C>,
    output: Producer<C, O>,
}

impl<C, O> Rule<C, O> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, context: &C) -> bool {
        (self.predicate)(context)
    }
}

/// Rules evaluated in insertion order
pub struct RuleTable<C, O> {
    rules: Vec<Rule<C, O>>,
}

impl<C, O> RuleTable<C, O> {
    pub fn new() -> Self {
        RuleTable { rules: Vec::new() }
    }

    /// Append a rule; earlier rules take priority
    pub fn rule<P, F>(mut self, name: &'static str, predicate: P, output: F) -> Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
        F: Fn(&C) -> O + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            name,
            predicate: Box::new(predicate),
            output: Box::new(output),
        });
        self
    }

    /// Outputs of every matching rule, in priority order
    pub fn evaluate(&self, context: &C) -> Vec<O> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(context))
            .map(|rule| (rule.output)(context))
            .collect()
    }

    /// Output of the highest-priority matching rule
    pub fn first_match(&self, context: &C) -> Option<O> {
        self.rules
            .iter()
            .find(|rule| rule.matches(context))
            .map(|rule| (rule.output)(context))
    }

    /// Names of the rules that fire for `context`
    pub fn matching_names(&self, context: &C) -> Vec<&'static str> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(context))
            .map(|rule| rule.name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<C, O> Default for RuleTable<C, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RuleTable<i32, String> {
        RuleTable::new()
            .rule("negative", |v: &i32| *v < 0, |_| "negative".to_string())
            .rule("large", |v: &i32| v.abs() > 100, |v| format!("large {}", v))
            .rule("always", |_| true, |_| "seen".to_string())
    }

    #[test]
    fn test_evaluate_keeps_priority_order() {
        assert_eq!(
            table().evaluate(&-500),
            vec!["negative", "large -500", "seen"]
        );
        assert_eq!(table().evaluate(&3), vec!["seen"]);
    }

    #[test]
    fn test_first_match() {
        assert_eq!(table().first_match(&200).as_deref(), Some("large 200"));
        let empty: RuleTable<i32, String> = RuleTable::new();
        assert!(empty.first_match(&1).is_none());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_matching_names() {
        assert_eq!(table().matching_names(&-1), vec!["negative", "always"]);
        assert_eq!(table().len(), 3);
    }
}
