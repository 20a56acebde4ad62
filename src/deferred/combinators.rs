//! Deferred Combinators
//!
//! Aggregates over several deferreds. Inputs keep settling on their own;
//! the aggregate only stops listening.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::promise::Deferred;

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    // == All ==
    /// Fulfills with every input's value, in input order, once all inputs
    /// have fulfilled. Rejects with the first rejection seen.
    ///
    /// Each input gets a pass-through callback appended to its own
    /// waterfall, so values seen by later callbacks on the input are
    /// unchanged. An empty list fulfills immediately with an empty `Vec`.
    ///
    /// An input counts as fulfilled when its pass-through callback runs. If
    /// a callback registered after `all` rejects that input mid-waterfall,
    /// the aggregate has already fulfilled and keeps its value.
    pub fn all(inputs: Vec<Deferred<T, E>>) -> Deferred<Vec<T>, E> {
        let aggregate = Deferred::<Vec<T>, E>::pending();
        if inputs.is_empty() {
            aggregate.resolve(Vec::new());
            return aggregate;
        }

        let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; inputs.len()]));
        let remaining = Rc::new(Cell::new(inputs.len()));

        for (index, input) in inputs.iter().enumerate() {
            let fulfilled = aggregate.clone();
            let slots = slots.clone();
            let remaining = remaining.clone();
            input.and_then(move |value| {
                slots.borrow_mut()[index] = Some(value.clone());
                remaining.set(remaining.get().saturating_sub(1));

                if remaining.get() == 0 && fulfilled.can_settle() {
                    let values: Vec<T> = slots.borrow_mut().drain(..).flatten().collect();
                    fulfilled.resolve(values);
                }
                value
            });

            let rejected = aggregate.clone();
            input.catch(move |err| {
                if rejected.can_settle() {
                    rejected.reject(err.clone());
                }
            });
        }

        aggregate
    }

    // == Race ==
    /// Settles the same way as whichever input settles first.
    ///
    /// An empty list never settles.
    pub fn race(inputs: Vec<Deferred<T, E>>) -> Deferred<T, E> {
        let winner = Deferred::<T, E>::pending();

        for input in &inputs {
            let fulfilled = winner.clone();
            input.and_then(move |value| {
                if fulfilled.can_settle() {
                    fulfilled.resolve(value.clone());
                }
                value
            });

            let rejected = winner.clone();
            input.catch(move |err| {
                if rejected.can_settle() {
                    rejected.reject(err.clone());
                }
            });
        }

        winner
    }
}

#[cfg(test)]
mod tests {
    use crate::deferred::{Deferred, Status};

    type Text = Deferred<&'static str, &'static str>;

    #[test]
    fn test_all_fulfills_in_input_order() {
        let first = Text::pending();
        let second = Text::pending();
        let third = Text::pending();

        let all = Text::all(vec![first.clone(), second.clone(), third.clone()]);

        // Settle out of order
        third.resolve("baz");
        first.resolve("foo");
        assert!(all.is_pending());
        second.resolve("bar");

        assert_eq!(all.result(), Some(Ok(vec!["foo", "bar", "baz"])));
    }

    #[test]
    fn test_all_short_circuits_on_rejection() {
        let first = Text::pending();
        let second = Text::pending();
        let third = Text::pending();

        let all = Text::all(vec![first.clone(), second.clone(), third.clone()]);

        first.resolve("foo");
        second.reject("bar");
        assert_eq!(all.result(), Some(Err("bar")));

        // Remaining inputs still settle, the aggregate ignores them
        third.resolve("baz");
        assert_eq!(third.status(), Status::Fulfilled);
        assert_eq!(all.result(), Some(Err("bar")));
    }

    #[test]
    fn test_all_with_already_settled_inputs() {
        let all = Text::all(vec![Text::resolved("a"), Text::resolved("b")]);
        assert_eq!(all.result(), Some(Ok(vec!["a", "b"])));

        let all = Text::all(vec![Text::resolved("a"), Text::rejected("b")]);
        assert_eq!(all.result(), Some(Err("b")));
    }

    #[test]
    fn test_all_keeps_value_when_input_rejects_later_in_waterfall() {
        let input = Text::pending();
        let all = Text::all(vec![input.clone()]);

        let rejecter = input.clone();
        input.and_then(move |value| {
            rejecter.reject("late");
            value
        });
        input.resolve("early");

        assert_eq!(input.status(), Status::Rejected);
        assert_eq!(input.result(), Some(Err("late")));
        assert_eq!(all.result(), Some(Ok(vec!["early"])));
    }

    #[test]
    fn test_all_empty_fulfills_immediately() {
        let all = Text::all(Vec::new());
        assert_eq!(all.result(), Some(Ok(Vec::new())));
    }

    #[test]
    fn test_all_leaves_input_values_untouched() {
        let input = Deferred::<i32, String>::pending();
        let all = Deferred::all(vec![input.clone()]);
        input.and_then(|value| value + 1);

        input.resolve(1);
        assert_eq!(input.result(), Some(Ok(2)));
        assert_eq!(all.result(), Some(Ok(vec![1])));
    }

    #[test]
    fn test_race_takes_first_settlement() {
        let slow = Text::pending();
        let fast = Text::pending();
        let race = Text::race(vec![slow.clone(), fast.clone()]);

        fast.resolve("fast");
        slow.reject("timeout");
        assert_eq!(race.result(), Some(Ok("fast")));

        let timer = Text::pending();
        let work = Text::pending();
        let race = Text::race(vec![work.clone(), timer.clone()]);
        timer.reject("timeout");
        assert_eq!(race.result(), Some(Err("timeout")));
    }

    #[test]
    fn test_race_empty_never_settles() {
        let race = Text::race(Vec::new());
        assert!(race.is_pending());
    }
}
