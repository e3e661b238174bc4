use bedrock_kernel::{Action, Ctx, Process, Resume, Simulation};
use criterion::{Criterion, criterion_group, criterion_main};

struct Ticker {
    period: f64,
}

impl Process<u32> for Ticker {
    fn name(&self) -> &str {
        "ticker"
    }

    fn step(&mut self, resume: Resume<u32>, _ctx: &mut Ctx<'_, u32>) -> Action<u32> {
        match resume {
            Resume::Start | Resume::Timer => Action::Wait(self.period),
            _ => Action::Halt,
        }
    }
}

/// Ten free-running timers over 10k simulated units: ~100k wake events.
fn bench_timer_events(c: &mut Criterion) {
    c.bench_function("kernel_timer_events_100k", |b| {
        b.iter(|| {
            let mut sim = Simulation::<u32>::new(1);
            for _ in 0..10 {
                sim.add(Box::new(Ticker { period: 1.0 }));
            }
            sim.run(10_000.0).expect("tickers cannot fail");
            sim.now()
        })
    });
}

struct Seeder {
    store: bedrock_kernel::StoreId,
}

impl Process<u32> for Seeder {
    fn name(&self) -> &str {
        "seeder"
    }

    fn step(&mut self, resume: Resume<u32>, _ctx: &mut Ctx<'_, u32>) -> Action<u32> {
        match resume {
            Resume::Start => Action::Put(self.store, 0),
            _ => Action::Halt,
        }
    }
}

struct PingPonger {
    store_in: bedrock_kernel::StoreId,
    store_out: bedrock_kernel::StoreId,
}

impl Process<u32> for PingPonger {
    fn name(&self) -> &str {
        "pingponger"
    }

    fn step(&mut self, resume: Resume<u32>, _ctx: &mut Ctx<'_, u32>) -> Action<u32> {
        match resume {
            Resume::Start => Action::Get(self.store_in),
            Resume::Item(v) => Action::Put(self.store_out, v + 1),
            // A real delay between bounces, so simulated time advances.
            Resume::Stored => Action::Wait(1.0),
            Resume::Timer => Action::Get(self.store_in),
            _ => Action::Halt,
        }
    }
}

/// Two processes bouncing a token through a pair of one-slot stores:
/// exercises the park/unpark paths rather than the timer wheel.
fn bench_store_pingpong(c: &mut Criterion) {
    c.bench_function("kernel_store_pingpong_10k", |b| {
        b.iter(|| {
            let mut sim = Simulation::<u32>::new(1);
            let a = sim.add_store(1);
            let z = sim.add_store(1);
            sim.add(Box::new(Seeder { store: a }));
            sim.add(Box::new(PingPonger { store_in: a, store_out: z }));
            sim.add(Box::new(PingPonger { store_in: z, store_out: a }));
            sim.run(10_000.0).expect("pingpong cannot fail");
        })
    });
}

criterion_group!(benches, bench_timer_events, bench_store_pingpong);
criterion_main!(benches);
