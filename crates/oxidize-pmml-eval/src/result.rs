use std::collections::BTreeMap;

use oxidize_pmml_core::Scalar;

/// What the per-category numbers of a [`Classification`] mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationKind {
    Probability,
    Vote,
    Affinity,
    /// Smaller is better.
    Distance,
    Similarity,
}

impl ClassificationKind {
    fn prefers_smaller(self) -> bool {
        self == ClassificationKind::Distance
    }
}

/// A categorical prediction together with its per-category evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: ClassificationKind,
    pub result: Scalar,
    pub values: BTreeMap<String, f64>,
    pub confidences: BTreeMap<String, f64>,
    /// Training record counts backing each category.
    pub record_counts: BTreeMap<String, f64>,
    pub entity_id: Option<String>,
    pub decision_path: Vec<String>,
}

impl Classification {
    pub fn new(kind: ClassificationKind, result: Scalar, values: BTreeMap<String, f64>) -> Self {
        Classification {
            kind,
            result,
            values,
            confidences: BTreeMap::new(),
            record_counts: BTreeMap::new(),
            entity_id: None,
            decision_path: Vec::new(),
        }
    }

    /// The best category of `values`; ties go to the lexicographically
    /// smallest category.
    pub fn best_category(kind: ClassificationKind, values: &BTreeMap<String, f64>) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (category, &value) in values {
            let better = match best {
                None => true,
                Some((_, current)) if kind.prefers_smaller() => value < current,
                Some((_, current)) => value > current,
            };
            if better {
                best = Some((category.as_str(), value));
            }
        }
        best.map(|(category, _)| category)
    }

    pub fn value(&self, category: &str) -> Option<f64> {
        self.values.get(category).copied()
    }

    pub fn confidence(&self, category: &str) -> Option<f64> {
        self.confidences.get(category).copied()
    }

    pub fn record_count(&self, category: &str) -> f64 {
        self.record_counts.get(category).copied().unwrap_or(0.0)
    }

    pub fn with_confidences(mut self, confidences: BTreeMap<String, f64>) -> Self {
        self.confidences = confidences;
        self
    }

    pub fn with_record_counts(mut self, record_counts: BTreeMap<String, f64>) -> Self {
        self.record_counts = record_counts;
        self
    }

    pub fn with_entity(mut self, entity_id: Option<String>, decision_path: Vec<String>) -> Self {
        self.entity_id = entity_id;
        self.decision_path = decision_path;
        self
    }
}

/// A scalar prediction attributed to a model substructure.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityValue {
    pub value: Scalar,
    pub entity_id: Option<String>,
    pub decision_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub id: String,
    pub support: f64,
    pub confidence: f64,
    pub consequent: Vec<String>,
}

/// Fired association rules, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationResult {
    pub rules: Vec<RuleMatch>,
    /// Consequent items not already in the transaction.
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Value(Scalar),
    Entity(EntityValue),
    Classification(Classification),
    Association(AssociationResult),
    /// One entry per segment, for `selectAll` ensembles.
    Collection(Vec<Option<ResultValue>>),
}

impl ResultValue {
    pub fn predicted_value(&self) -> Option<&Scalar> {
        match self {
            ResultValue::Value(v) => Some(v),
            ResultValue::Entity(e) => Some(&e.value),
            ResultValue::Classification(c) => Some(&c.result),
            ResultValue::Association(_) | ResultValue::Collection(_) => None,
        }
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            ResultValue::Classification(c) => Some(c),
            _ => None,
        }
    }

    pub fn association(&self) -> Option<&AssociationResult> {
        match self {
            ResultValue::Association(a) => Some(a),
            _ => None,
        }
    }

    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ResultValue::Entity(e) => e.entity_id.as_deref(),
            ResultValue::Classification(c) => c.entity_id.as_deref(),
            ResultValue::Association(a) => a.rules.first().map(|r| r.id.as_str()),
            _ => None,
        }
    }

    pub fn decision_path(&self) -> Option<&[String]> {
        match self {
            ResultValue::Entity(e) if !e.decision_path.is_empty() => Some(&e.decision_path),
            ResultValue::Classification(c) if !c.decision_path.is_empty() => Some(&c.decision_path),
            _ => None,
        }
    }
}

/// The outcome of one nested model inside an ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentResult {
    pub id: String,
    pub weight: f64,
    pub results: Results,
}

/// Named outputs of one model evaluation.
///
/// A `None` entry is a field that was evaluated and came out missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    values: BTreeMap<String, Option<ResultValue>>,
    segments: Vec<SegmentResult>,
}

impl Results {
    pub fn new() -> Self {
        Results::default()
    }

    pub fn single(name: &str, value: Option<ResultValue>) -> Self {
        let mut results = Results::new();
        results.insert(name, value);
        results
    }

    pub fn insert(&mut self, name: &str, value: Option<ResultValue>) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ResultValue>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn segments(&self) -> &[SegmentResult] {
        &self.segments
    }

    pub fn push_segment(&mut self, segment: SegmentResult) {
        self.segments.push(segment);
    }

    /// Results of a nested segment, addressed by segment ids from the top.
    pub fn segment(&self, path: &[&str]) -> Option<&Results> {
        let mut current = self;
        for id in path {
            current = &current.segments.iter().find(|s| s.id == *id)?.results;
        }
        Some(current)
    }
}
