use proptest::prelude::*;
use mslash::console::BufferConsole;
use mslash::script::expand::{interpolate, strip_comments};
use mslash::script::expr::evaluate;
use mslash::script::stmt::source_lines;
use mslash::script::{preprocess, Environment, Interpreter, Value};

fn run(src: &str) -> String {
    let mut interp = Interpreter::with_console(BufferConsole::new());
    interp.exec_source(src).expect("script failed");
    interp.console().output().to_owned()
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

proptest! {
    /// The evaluator is fail-soft: arbitrary text yields a value or nothing.
    #[test]
    fn evaluate_does_not_panic(s in "\\PC*") {
        let _ = evaluate(&s, &Environment::new());
    }

    /// Same for the full executor: unknown lines are reported, never fatal.
    #[test]
    fn executor_does_not_panic(s in "[a-z{}()$ =+\\n0-9.'\\[\\]]{0,80}") {
        let mut interp = Interpreter::with_console(BufferConsole::new());
        let _ = interp.exec_source(&s);
    }

    #[test]
    fn preprocess_keeps_line_numbers(s in "((say [a-z]{1,5}|func f\\(x\\)|endfunc|class C|endclass)?\\n){0,12}") {
        let lines = source_lines(&s);
        let total = lines.len();
        let pre = preprocess(&lines);
        for line in &pre.main {
            prop_assert!(line.number >= 1 && line.number <= total);
        }
    }
}

proptest! {
    #[test]
    fn brace_free_text_has_no_comments(s in "[^{}]*") {
        prop_assert_eq!(strip_comments(&s), s);
    }

    #[test]
    fn text_without_sequences_is_not_interpolated(s in "[^$]*") {
        prop_assert_eq!(interpolate(&s, &Environment::new()), Ok(s.clone()));
    }

    #[test]
    fn inline_comments_are_removed(code in "[a-z0-9 +]{0,20}", note in "[a-z ]{0,20}") {
        prop_assert_eq!(strip_comments(&format!("{code}{{{note}}}")), code);
    }
}

proptest! {
    #[test]
    fn integer_arithmetic_matches_host(a in -10_000i64..10_000, b in -10_000i64..10_000, c in -100i64..100) {
        let env = Environment::new();
        prop_assert_eq!(evaluate(&format!("{a} + {b} * {c}"), &env), Some(Value::Int(a + b * c)));
        prop_assert_eq!(evaluate(&format!("({a} - {b}) * {c}"), &env), Some(Value::Int((a - b) * c)));
    }

    #[test]
    fn floor_division_rounds_down(a in -1_000i64..1_000, b in prop_oneof![-50i64..-1, 1i64..50]) {
        let env = Environment::new();
        prop_assert_eq!(evaluate(&format!("{a} // {b}"), &env), Some(Value::Int(floor_div(a, b))));
        prop_assert_eq!(
            evaluate(&format!("{a} % {b}"), &env),
            Some(Value::Int(a - b * floor_div(a, b)))
        );
    }

    #[test]
    fn comparisons_match_host(a in -100i64..100, b in -100i64..100) {
        let env = Environment::new();
        prop_assert_eq!(evaluate(&format!("{a} < {b}"), &env), Some(Value::Bool(a < b)));
        prop_assert_eq!(evaluate(&format!("{a} == {b}"), &env), Some(Value::Bool(a == b)));
        prop_assert_eq!(evaluate(&format!("{a} >= {b}"), &env), Some(Value::Bool(a >= b)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Blank lines and comment-only lines never change what a program prints.
    #[test]
    fn blank_and_comment_lines_are_inert(
        values in prop::collection::vec(-1000i64..1000, 1..8),
        noise in prop::collection::vec(prop_oneof![Just(""), Just("   "), Just("{ note }"), Just("{}")], 1..8),
    ) {
        let plain: Vec<String> = values.iter().map(|v| format!("say {v}")).collect();
        let mut noisy = Vec::new();
        for (i, line) in plain.iter().enumerate() {
            noisy.push(noise[i % noise.len()].to_owned());
            noisy.push(format!("{line} {{trailing}}"));
        }
        prop_assert_eq!(run(&plain.join("\n")), run(&noisy.join("\n")));
    }

    #[test]
    fn loop_runs_count_times(n in 0usize..20) {
        let out = run(&format!("loop {n}\nsay x\nendloop"));
        prop_assert_eq!(out.lines().count(), n);
    }

    #[test]
    fn function_results_round_trip(a in -1000i64..1000, b in -1000i64..1000) {
        let src = format!("func add(x, y)\nreturn ${{x + y}}\nendfunc\nvar r = add({a}, {b})\nsay r");
        prop_assert_eq!(run(&src), format!("{}\n", a + b));
    }
}
