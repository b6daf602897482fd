use crate::{Action, State};

/// Dense `(state, action) -> T` table stored row-major by state.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTable<T> {
    num_states: usize,
    num_actions: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> PairTable<T> {
    /// Create a table with every entry set to `T::default()`.
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Self::filled(num_states, num_actions, T::default())
    }
}

impl<T: Copy> PairTable<T> {
    /// Create a table with every entry set to `value`.
    pub fn filled(num_states: usize, num_actions: usize, value: T) -> Self {
        PairTable {
            num_states,
            num_actions,
            data: vec![value; num_states * num_actions],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Read one entry. Panics on out-of-range ids.
    pub fn get(&self, state: State, action: Action) -> T {
        self.data[self.offset(state, action)]
    }

    /// Overwrite one entry. Panics on out-of-range ids.
    pub fn set(&mut self, state: State, action: Action, value: T) {
        let offset = self.offset(state, action);
        self.data[offset] = value;
    }

    /// Mutable access to one entry.
    pub fn get_mut(&mut self, state: State, action: Action) -> &mut T {
        let offset = self.offset(state, action);
        &mut self.data[offset]
    }

    /// All action entries for one state, indexed by action.
    pub fn row(&self, state: State) -> &[T] {
        let start = self.row_start(state);
        &self.data[start..start + self.num_actions]
    }

    pub fn row_mut(&mut self, state: State) -> &mut [T] {
        let start = self.row_start(state);
        &mut self.data[start..start + self.num_actions]
    }

    /// Whether both ids fall inside the table.
    pub fn contains(&self, state: State, action: Action) -> bool {
        state.index() < self.num_states && action.index() < self.num_actions
    }

    fn row_start(&self, state: State) -> usize {
        assert!(
            state.index() < self.num_states,
            "state {} out of range for {} states",
            state.index(),
            self.num_states
        );
        state.index() * self.num_actions
    }

    fn offset(&self, state: State, action: Action) -> usize {
        assert!(
            action.index() < self.num_actions,
            "action {} out of range for {} actions",
            action.index(),
            self.num_actions
        );
        self.row_start(state) + action.index()
    }
}

/// Dense `(state, action, next_state) -> T` table.
///
/// Each `(state, action)` pair owns a contiguous row of `num_states` entries, so
/// per-row scans (validation, sampling, expectations) never hash.
#[derive(Debug, Clone, PartialEq)]
pub struct TripleTable<T> {
    num_states: usize,
    num_actions: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> TripleTable<T> {
    /// Create a table with every entry set to `T::default()`.
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Self::filled(num_states, num_actions, T::default())
    }
}

impl<T: Copy> TripleTable<T> {
    /// Create a table with every entry set to `value`.
    pub fn filled(num_states: usize, num_actions: usize, value: T) -> Self {
        TripleTable {
            num_states,
            num_actions,
            data: vec![value; num_states * num_actions * num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Whether another table has the same dimensions.
    pub fn same_shape<U>(&self, other: &TripleTable<U>) -> bool {
        self.num_states == other.num_states && self.num_actions == other.num_actions
    }

    pub fn get(&self, state: State, action: Action, next: State) -> T {
        self.row(state, action)[next.index()]
    }

    pub fn set(&mut self, state: State, action: Action, next: State, value: T) {
        self.row_mut(state, action)[next.index()] = value;
    }

    /// Next-state entries for one `(state, action)` pair, indexed by next state.
    pub fn row(&self, state: State, action: Action) -> &[T] {
        let start = self.row_start(state, action);
        &self.data[start..start + self.num_states]
    }

    pub fn row_mut(&mut self, state: State, action: Action) -> &mut [T] {
        let start = self.row_start(state, action);
        let len = self.num_states;
        &mut self.data[start..start + len]
    }

    /// Replace a whole row. Panics if `values` does not have `num_states` entries.
    pub fn set_row(&mut self, state: State, action: Action, values: &[T]) {
        self.row_mut(state, action).copy_from_slice(values);
    }

    pub fn contains(&self, state: State, action: Action, next: State) -> bool {
        state.index() < self.num_states
            && action.index() < self.num_actions
            && next.index() < self.num_states
    }

    fn row_start(&self, state: State, action: Action) -> usize {
        assert!(
            state.index() < self.num_states,
            "state {} out of range for {} states",
            state.index(),
            self.num_states
        );
        assert!(
            action.index() < self.num_actions,
            "action {} out of range for {} actions",
            action.index(),
            self.num_actions
        );
        (state.index() * self.num_actions + action.index()) * self.num_states
    }
}

/// Iterate every `(state, action)` pair in row-major order.
pub fn state_action_pairs(
    num_states: usize,
    num_actions: usize,
) -> impl Iterator<Item = (State, Action)> {
    (0..num_states)
        .flat_map(move |s| (0..num_actions).map(move |a| (State::from(s), Action::from(a))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_contiguous_per_pair() {
        let mut table = TripleTable::<f64>::new(3, 2);
        table.set(State::from(1), Action::from(1), State::from(2), 0.5);

        assert_eq!(table.row(State::from(1), Action::from(1)), &[0.0, 0.0, 0.5]);
        assert_eq!(table.row(State::from(1), Action::from(0)), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn pair_rows_index_by_action() {
        let mut table = PairTable::<u64>::new(2, 3);
        *table.get_mut(State::from(1), Action::from(2)) += 4;

        assert_eq!(table.row(State::from(1)), &[0, 0, 4]);
        assert_eq!(state_action_pairs(2, 3).count(), 6);
    }

    #[test]
    #[should_panic(expected = "action 2 out of range")]
    fn out_of_range_action_does_not_alias_the_next_row() {
        let table = TripleTable::<f64>::filled(2, 2, 0.5);
        table.get(State::from(0), Action::from(2), State::from(1));
    }

    #[test]
    #[should_panic(expected = "action 3 out of range")]
    fn pair_lookup_checks_the_action() {
        let table = PairTable::<u64>::new(2, 3);
        table.get(State::from(0), Action::from(3));
    }

    #[test]
    #[should_panic(expected = "state 2 out of range")]
    fn pair_row_checks_the_state() {
        let table = PairTable::<u64>::new(2, 3);
        table.row(State::from(2));
    }
}
