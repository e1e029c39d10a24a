use std::collections::{HashMap, HashSet};

/// Bidirectional lookup between stable ids and model substructures
/// (tree nodes, segments, neurons, training instances, rules).
///
/// Built once per evaluator and only read afterwards. Entities without an
/// explicit id get their 1-based position in registration order, or the
/// next free number when an explicit id already uses that position.
#[derive(Debug)]
pub struct EntityRegistry<'m, E> {
    entities: Vec<(String, &'m E)>,
    by_id: HashMap<String, usize>,
    by_address: HashMap<usize, usize>,
}

impl<'m, E> EntityRegistry<'m, E> {
    pub fn build<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = (Option<&'m str>, &'m E)>,
    {
        let mut registry = EntityRegistry {
            entities: Vec::new(),
            by_id: HashMap::new(),
            by_address: HashMap::new(),
        };

        let entities: Vec<(Option<&'m str>, &'m E)> = entities.into_iter().collect();
        let explicit: HashSet<&str> = entities.iter().filter_map(|&(id, _)| id).collect();

        for (position, (id, entity)) in entities.into_iter().enumerate() {
            let id = match id {
                Some(id) => id.to_string(),
                None => registry.free_id(position + 1, &explicit),
            };
            if registry.by_id.contains_key(&id) {
                tracing::warn!(id = %id, "duplicate entity id, keeping the first");
                continue;
            }
            let index = registry.entities.len();
            registry.by_id.insert(id.clone(), index);
            registry.by_address.insert(address(entity), index);
            registry.entities.push((id, entity));
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<&'m E> {
        self.by_id.get(id).map(|&index| self.entities[index].1)
    }

    pub fn id_of(&self, entity: &E) -> Option<&str> {
        self.by_address
            .get(&address(entity))
            .map(|&index| self.entities[index].0.as_str())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn free_id(&self, from: usize, explicit: &HashSet<&str>) -> String {
        let mut number = from;
        loop {
            let id = number.to_string();
            if !explicit.contains(id.as_str()) && !self.by_id.contains_key(&id) {
                return id;
            }
            number += 1;
        }
    }
}

fn address<E>(entity: &E) -> usize {
    entity as *const E as usize
}
