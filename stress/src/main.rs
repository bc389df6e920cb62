use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use tracing_subscriber::EnvFilter;

use visitgate::{
    AccessController, AccessControllerOptions, ExpectedConcurrency, SweepInterval, VisitLimit,
    WindowDuration, key::decode_ipv4,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyDist {
    /// Every thread hits one key.
    Hot,
    /// Keys drawn uniformly from `--key-space`.
    Uniform,
    /// `--hot-fraction` of calls hit one key, the rest are uniform.
    Skewed,
    /// Every call uses a key never seen before.
    Churn,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Mode {
    Max,
    TargetQps,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Identity {
    /// Call `try_admit` with integer keys.
    Integer,
    /// Render keys as dotted quads and call `try_admit_text`.
    Ipv4,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "visitgate-stress",
    about = "Load test / benchmark harness for visitgate"
)]
struct Args {
    #[arg(long, value_enum, default_value_t = KeyDist::Uniform)]
    key_dist: KeyDist,

    #[arg(long, value_enum, default_value_t = Mode::Max)]
    mode: Mode,

    #[arg(long, value_enum, default_value_t = Identity::Integer)]
    identity: Identity,

    #[arg(long, default_value_t = 8)]
    threads: usize,

    #[arg(long, default_value_t = 30)]
    duration_s: u64,

    #[arg(long, default_value_t = 10_000)]
    window_ms: u64,

    #[arg(long, default_value_t = 1_000)]
    sweep_ms: u64,

    #[arg(long, default_value_t = 100)]
    limit: usize,

    #[arg(long, default_value_t = 1_000)]
    expected_concurrency: usize,

    #[arg(long, default_value_t = 100_000)]
    key_space: u64,

    #[arg(long, default_value_t = 0.8)]
    hot_fraction: f64,

    #[arg(long, default_value_t = 100)]
    sample_every: u64,

    /// How often the pool size is logged.
    #[arg(long, default_value_t = 1_000)]
    report_ms: u64,

    #[arg(long)]
    target_qps: Option<u64>,

    #[arg(long)]
    burst_qps: Option<u64>,

    #[arg(long, default_value_t = 30_000)]
    burst_period_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    burst_duration_ms: u64,
}

#[derive(Default)]
struct Counts {
    admitted: AtomicU64,
    denied: AtomicU64,
}

fn build_options(args: &Args) -> AccessControllerOptions {
    AccessControllerOptions {
        window: WindowDuration::try_from(Duration::from_millis(args.window_ms)).unwrap(),
        sweep_interval: SweepInterval::try_from(Duration::from_millis(args.sweep_ms)).unwrap(),
        limit: VisitLimit::try_from(args.limit).unwrap(),
        expected_concurrency: ExpectedConcurrency::try_from(args.expected_concurrency).unwrap(),
    }
}

fn should_sample(iter: u64, sample_every: u64) -> bool {
    if sample_every <= 1 {
        return true;
    }

    iter.is_multiple_of(sample_every)
}

fn qps_for_now(args: &Args, started: Instant) -> Option<u64> {
    if args.mode == Mode::Max {
        return None;
    }

    let base = args.target_qps?;

    if let Some(burst_qps) = args.burst_qps {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let in_period = elapsed_ms % args.burst_period_ms;
        if in_period < args.burst_duration_ms {
            return Some(burst_qps);
        }
    }

    Some(base)
}

fn pick_key(args: &Args, churn: &AtomicU64, thread_rng: &mut impl FnMut() -> u64) -> u64 {
    let space = args.key_space.max(1);

    match args.key_dist {
        KeyDist::Hot => 1,
        KeyDist::Uniform => 1 + thread_rng() % space,
        KeyDist::Skewed => {
            let r = (thread_rng() % 10_000) as f64 / 10_000.0;
            if r < args.hot_fraction {
                1
            } else {
                2 + thread_rng() % space
            }
        }
        KeyDist::Churn => 1 + churn.fetch_add(1, Ordering::Relaxed),
    }
}

fn print_results(
    args: &Args,
    elapsed: Duration,
    ops: u64,
    hist: &Histogram<u64>,
    counts: &Counts,
    controller: &AccessController,
) {
    let ops_s = ops as f64 / elapsed.as_secs_f64();

    println!(
        "key_dist={:?} mode={:?} identity={:?}",
        args.key_dist, args.mode, args.identity
    );
    println!(
        "threads={} duration_s={} window_ms={} sweep_ms={} limit={} expected_concurrency={} key_space={}",
        args.threads,
        args.duration_s,
        args.window_ms,
        args.sweep_ms,
        args.limit,
        args.expected_concurrency,
        args.key_space
    );
    println!(
        "elapsed_s={:.3} ops={} ops_per_s={:.0}",
        elapsed.as_secs_f64(),
        ops,
        ops_s
    );
    println!(
        "admitted={} denied={}",
        counts.admitted.load(Ordering::Relaxed),
        counts.denied.load(Ordering::Relaxed)
    );
    println!(
        "pool_len={} free_slots={} active_keys={}",
        controller.pool_len(),
        controller.free_slot_count(),
        controller.active_keys()
    );
    if !hist.is_empty() {
        println!(
            "lat_us p50={} p95={} p99={} p999={} max={}",
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.max()
        );
        println!("sample_every={} samples={}", args.sample_every, hist.len());
    } else {
        println!("no latency samples collected");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let controller = match AccessController::new(build_options(&args)) {
        Ok(controller) => Arc::new(controller),
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let counts = Arc::new(Counts::default());
    let total_ops = Arc::new(AtomicU64::new(0));
    let churn = Arc::new(AtomicU64::new(0));

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_s);

    let mut handles = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let controller = Arc::clone(&controller);
        let stop = Arc::clone(&stop);
        let counts = Arc::clone(&counts);
        let total_ops = Arc::clone(&total_ops);
        let churn = Arc::clone(&churn);
        let args = args.clone();

        handles.push(std::thread::spawn(move || {
            let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
            let mut i = 0_u64;
            let mut seed = (t as u64 + 1) * 0x9E37_79B9_7F4A_7C15;
            let mut next_deadline = Instant::now();

            let mut rng_u64 = || {
                // xorshift64*
                seed ^= seed >> 12;
                seed ^= seed << 25;
                seed ^= seed >> 27;
                seed = seed.wrapping_mul(0x2545_F491_4F6C_DD1D);
                seed
            };

            while !stop.load(Ordering::Relaxed) {
                if Instant::now() >= deadline {
                    break;
                }

                if let Some(qps) = qps_for_now(&args, started) {
                    let per_op_ns = 1_000_000_000u64 / qps.max(1);
                    let now = Instant::now();
                    if now < next_deadline {
                        std::thread::sleep(next_deadline - now);
                    }
                    next_deadline += Duration::from_nanos(per_op_ns);
                }

                i = i.wrapping_add(1);
                let key = pick_key(&args, &churn, &mut rng_u64);
                let identity = match args.identity {
                    Identity::Integer => None,
                    Identity::Ipv4 => Some(decode_ipv4(key)),
                };

                let sample = should_sample(i, args.sample_every);
                let t0 = if sample { Some(Instant::now()) } else { None };

                let admitted = match &identity {
                    None => controller.try_admit(key),
                    Some(text) => controller.try_admit_text(text),
                };

                if let Some(t0) = t0 {
                    let us = t0.elapsed().as_micros() as u64;
                    let _ = hist.record(us.max(1));
                }

                total_ops.fetch_add(1, Ordering::Relaxed);
                if admitted {
                    counts.admitted.fetch_add(1, Ordering::Relaxed);
                } else {
                    counts.denied.fetch_add(1, Ordering::Relaxed);
                }
            }

            hist
        }));
    }

    let report_every = Duration::from_millis(args.report_ms.max(1));
    while Instant::now() < deadline {
        std::thread::sleep(report_every.min(deadline.saturating_duration_since(Instant::now())));
        tracing::info!(
            pool_len = controller.pool_len(),
            free_slots = controller.free_slot_count(),
            active_keys = controller.active_keys(),
            ops = total_ops.load(Ordering::Relaxed),
            "progress"
        );
    }
    stop.store(true, Ordering::Relaxed);

    let mut merged = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
    for h in handles {
        let hist = h.join().unwrap();
        merged.add(&hist).unwrap();
    }

    let elapsed = started.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    print_results(&args, elapsed, ops, &merged, &counts, &controller);
}
