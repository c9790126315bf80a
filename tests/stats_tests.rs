/// Integration tests for memoization statistics and custom names

#[cfg(feature = "stats")]
#[cfg(test)]
mod tests {
    use memoscope::{memoize, stats_registry, CallArgs, Memoizer, Scope, Signature};
    use serial_test::serial;
    use std::convert::Infallible;

    // Define functions outside tests to ensure they share the same statics
    #[memoize(global = true, name = "custom_stats_cache")]
    fn with_custom_name(x: i32) -> i32 {
        x * 2
    }

    #[memoize(global = true)]
    fn with_default_name(x: i32) -> i32 {
        x * 3
    }

    #[memoize]
    fn scoped_counter(scope: &Scope, x: i32) -> Result<i32, String> {
        if x < 0 {
            Err("negative".to_string())
        } else {
            Ok(x)
        }
    }

    #[test]
    #[serial]
    fn test_names_registered() {
        with_custom_name(900100);
        with_default_name(900100);

        let registered = stats_registry::list();
        assert!(
            registered.contains(&"custom_stats_cache".to_string()),
            "Custom name should be registered"
        );
        assert!(
            registered.contains(&"with_default_name".to_string()),
            "Default name should be registered"
        );
        assert!(!registered.contains(&"with_custom_name".to_string()));
    }

    #[test]
    #[serial]
    fn test_hits_misses_and_failures() {
        stats_registry::reset("scoped_counter");

        let scope = Scope::new();
        scoped_counter(&scope, 1).unwrap();
        scoped_counter(&scope, 1).unwrap();
        scoped_counter(&scope.fork(), 1).unwrap();
        scoped_counter(&Scope::new(), 1).unwrap();
        assert!(scoped_counter(&scope, -1).is_err());

        let stats = stats_registry::get("scoped_counter").unwrap();
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 3);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.total_accesses(), 5);
        assert!((stats.hit_rate() - 0.4).abs() < 1e-9);
    }

    #[test]
    #[serial]
    fn test_reset_through_registry() {
        with_custom_name(7);
        with_custom_name(7);
        assert!(stats_registry::get("custom_stats_cache").unwrap().hits() >= 1);

        assert!(stats_registry::reset("custom_stats_cache"));
        let stats = stats_registry::get("custom_stats_cache").unwrap();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 0);
        assert!(!stats_registry::reset("never_registered"));
    }

    #[test]
    #[serial]
    fn test_unnamed_wrapper_not_published() {
        let before = stats_registry::list().len();
        let memo = Memoizer::new().global(true).wrap(
            Signature::new().required("x"),
            |_: &Scope, args: &CallArgs<u8>| Ok::<_, Infallible>(args.positional()[0]),
        );
        memo.call(&Scope::new(), &CallArgs::new().arg(1u8)).unwrap();
        memo.call(&Scope::new(), &CallArgs::new().arg(1u8)).unwrap();

        assert_eq!(stats_registry::list().len(), before);
        assert_eq!(memo.stats().hits(), 1);
        assert_eq!(memo.stats().misses(), 1);
    }
}
