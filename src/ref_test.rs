// Reference model, a plain sorted vector of values.
struct RefValues {
    values: Vec<i64>,
}

impl RefValues {
    fn new(capacity: usize) -> RefValues {
        RefValues {
            values: Vec::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn insert(&mut self, value: i64) {
        let off = self.values.partition_point(|x| *x <= value);
        self.values.insert(off, value);
    }

    fn erase(&mut self, value: i64) -> Option<i64> {
        let off = self.values.iter().position(|x| *x == value)?;
        Some(self.values.remove(off))
    }

    fn contains(&self, value: i64) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    fn get(&self, index: usize) -> Option<i64> {
        self.values.get(index).cloned()
    }

    fn lower_bound(&self, value: i64) -> usize {
        self.values.partition_point(|x| *x < value)
    }

    fn upper_bound(&self, value: i64) -> usize {
        self.values.partition_point(|x| *x <= value)
    }

    fn iter(&self) -> std::slice::Iter<'_, i64> {
        self.values.iter()
    }
}

fn random_value(size: usize) -> i64 {
    (random::<u64>() % (size as u64)) as i64
}
