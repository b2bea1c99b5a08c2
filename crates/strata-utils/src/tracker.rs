/// Stack of in-progress work items plus a log of everything finished.
///
/// Items are started in nesting order, so the pending list doubles as the
/// current path. Finishing always completes the innermost item.
#[derive(Debug, Clone)]
pub struct Tracker<T> {
    /// Items that are pending completion, innermost last
    todo: Vec<T>,
    /// Items that have been completed, in completion order
    done: Vec<T>,
}

impl<T> Default for Tracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tracker<T> {
    /// Creates a new, empty `Tracker`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_utils::tracker::Tracker;
    ///
    /// let tracker: Tracker<i32> = Tracker::new();
    /// assert!(tracker.is_idle());
    /// ```
    pub fn new() -> Self {
        Tracker {
            todo: Vec::new(),
            done: Vec::new(),
        }
    }

    /// Pushes a new item onto the pending stack.
    pub fn start(&mut self, item: T) {
        self.todo.push(item);
    }

    /// Moves the innermost pending item to the done list and returns a reference to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_utils::tracker::Tracker;
    ///
    /// let mut tracker = Tracker::new();
    /// tracker.start("outer");
    /// tracker.start("inner");
    /// assert_eq!(tracker.finish(), Some(&"inner"));
    /// assert_eq!(tracker.current(), Some(&"outer"));
    /// ```
    pub fn finish(&mut self) -> Option<&T> {
        let current = self.todo.pop()?;
        self.done.push(current);
        self.done.last()
    }

    /// Removes the innermost pending item without recording it as done.
    pub fn discard(&mut self) -> Option<T> {
        self.todo.pop()
    }

    /// Returns the innermost pending item, if any.
    pub fn current(&self) -> Option<&T> {
        self.todo.last()
    }

    pub fn is_idle(&self) -> bool {
        self.todo.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.todo.len()
    }

    pub fn completed_count(&self) -> usize {
        self.done.len()
    }

    /// Pending items, outermost first.
    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.todo.iter()
    }

    /// Completed items in completion order.
    pub fn completed(&self) -> impl Iterator<Item = &T> {
        self.done.iter()
    }

    /// Consumes the tracker and returns only the completed items.
    pub fn into_completed(self) -> Vec<T> {
        self.done
    }
}

impl<T: PartialEq> Tracker<T> {
    pub fn is_pending(&self, item: &T) -> bool {
        self.todo.contains(item)
    }

    /// Returns the pending path starting at `item`, outermost first.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_utils::tracker::Tracker;
    ///
    /// let mut tracker = Tracker::new();
    /// tracker.start('a');
    /// tracker.start('b');
    /// tracker.start('c');
    /// assert_eq!(tracker.pending_from(&'b'), Some(&['b', 'c'][..]));
    /// assert_eq!(tracker.pending_from(&'z'), None);
    /// ```
    pub fn pending_from(&self, item: &T) -> Option<&[T]> {
        let start = self.todo.iter().position(|it| it == item)?;
        Some(&self.todo[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_does_not_record_completion() {
        let mut tracker = Tracker::new();
        tracker.start(1);
        tracker.start(2);

        assert_eq!(tracker.discard(), Some(2));
        tracker.finish();

        assert!(tracker.is_idle());
        assert_eq!(tracker.into_completed(), vec![1]);
    }

    #[test]
    fn finish_on_empty_is_noop() {
        let mut tracker: Tracker<u8> = Tracker::new();
        assert_eq!(tracker.finish(), None);
        assert_eq!(tracker.completed_count(), 0);
    }
}
