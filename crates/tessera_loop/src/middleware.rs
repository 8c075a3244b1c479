//! Middleware - wrappers around a frame's system run
//!
//! A middleware receives the event name, the loop state and a `next`
//! continuation that runs everything it wraps. It may run code before or
//! after `next`, call it more than once, or skip it. Middleware added later
//! wraps middleware added earlier.

/// Per-frame middleware function
pub type Middleware<S> = Box<dyn FnMut(&str, &mut S, &mut dyn FnMut(&mut S))>;

/// Run `innermost` wrapped by `chain`, last entry outermost
pub(crate) fn run_chain<S>(
    chain: &mut [Middleware<S>],
    event: &str,
    state: &mut S,
    innermost: &mut dyn FnMut(&mut S),
) {
    match chain.split_last_mut() {
        None => innermost(state),
        Some((outer, rest)) => {
            let mut next = |state: &mut S| run_chain(&mut *rest, event, state, &mut *innermost);
            outer(event, state, &mut next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_middleware_wraps_earlier() {
        let mut chain: Vec<Middleware<Vec<String>>> = Vec::new();
        for name in ["first", "second"] {
            chain.push(Box::new(move |_event: &str, log: &mut Vec<String>, next: &mut dyn FnMut(&mut Vec<String>)| {
                log.push(format!("{} before", name));
                next(log);
                log.push(format!("{} after", name));
            }));
        }

        let mut log = Vec::new();
        run_chain(&mut chain, "default", &mut log, &mut |log: &mut Vec<String>| {
            log.push("systems".to_string())
        });

        assert_eq!(
            log,
            vec!["second before", "first before", "systems", "first after", "second after"]
        );
    }

    #[test]
    fn test_middleware_can_skip_frame() {
        let mut chain: Vec<Middleware<u32>> = vec![Box::new(|event: &str, _: &mut u32, next: &mut dyn FnMut(&mut u32)| {
            if event != "paused" {
                next(&mut 0);
            }
        })];

        let mut runs = 0;
        run_chain(&mut chain, "paused", &mut 0, &mut |_| runs += 1);
        assert_eq!(runs, 0);
        run_chain(&mut chain, "default", &mut 0, &mut |_| runs += 1);
        assert_eq!(runs, 1);
    }
}
