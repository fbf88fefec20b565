//! Steel Dash headless runner
//!
//! The game itself runs in the browser. Natively this drives the simulation
//! with scripted bots for soak testing:
//!
//! ```text
//! steel-dash [--duel] [--seed N] [--ticks N] [--map city|forest|desert|maze]
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use steel_dash::consts::TICKS_PER_SECOND;
    use steel_dash::net::{MemoryRoom, Multiplayer};
    use steel_dash::platform::Session;
    use steel_dash::sim::{Aim, GameEvent, GamePhase, TickInput};
    use steel_dash::tuning::MapStyle;
    use steel_dash::{Result, Settings, Tuning};

    pub struct Options {
        pub duel: bool,
        pub seed: u64,
        pub ticks: u64,
        pub map: MapStyle,
    }

    impl Options {
        pub fn from_args(args: &[String]) -> Self {
            let value = |flag: &str| {
                args.iter()
                    .position(|a| a == flag)
                    .and_then(|i| args.get(i + 1))
            };
            Self {
                duel: args.iter().any(|a| a == "--duel"),
                seed: value("--seed").and_then(|s| s.parse().ok()).unwrap_or(42),
                ticks: value("--ticks")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60 * u64::from(TICKS_PER_SECOND)),
                map: value("--map")
                    .and_then(|s| MapStyle::from_str(s))
                    .unwrap_or_default(),
            }
        }
    }

    fn clock(tick: u64) -> f64 {
        tick as f64 * 1000.0 / f64::from(TICKS_PER_SECOND)
    }

    /// Wanders, re-rolling its heading every half second, and shoots at a target
    struct Bot {
        rng: Pcg32,
        heading: Vec2,
    }

    impl Bot {
        fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed),
                heading: Vec2::ZERO,
            }
        }

        fn input(&mut self, tick: u64, target: Option<Vec2>) -> TickInput {
            if tick % 30 == 0 {
                let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
                self.heading = Vec2::new(angle.cos(), angle.sin());
            }
            TickInput {
                move_dir: self.heading,
                aim: target
                    .map(|t| Aim::Pointer { x: t.x, y: t.y })
                    .unwrap_or_default(),
                fire: target.is_some(),
                dash: self.rng.random_bool(0.01),
                pause: false,
                now_ms: clock(tick),
            }
        }
    }

    fn tally(events: &[GameEvent], kills: &mut u32, waves: &mut u32) {
        for event in events {
            match event {
                GameEvent::EnemyDestroyed { .. } => *kills += 1,
                GameEvent::WaveCleared { .. } => *waves += 1,
                _ => {}
            }
        }
    }

    pub fn run_solo(opts: &Options) -> Result<()> {
        let settings = Settings {
            name: "Soak".into(),
            map: opts.map,
            ..Settings::default()
        };
        let mut session = Session::solo(opts.seed, Tuning::default(), settings)?;
        let mut bot = Bot::new(opts.seed.wrapping_add(1));
        let (mut kills, mut waves) = (0, 0);

        for t in 0..opts.ticks {
            let state = session.state();
            let me = state.player.tank.center();
            let target = state
                .enemies
                .iter()
                .map(|e| e.tank.center())
                .min_by(|a, b| a.distance(me).total_cmp(&b.distance(me)));
            let input = bot.input(t, target);
            session.step(&input);
            tally(&session.take_events(), &mut kills, &mut waves);
            if session.state().phase == GamePhase::GameOver {
                log::info!("Run ended after {} ticks", t + 1);
                break;
            }
        }

        let hud = session.hud();
        println!(
            "solo seed={} map={} score={} wave={} lives={} kills={} waves_cleared={} rank={:?}",
            opts.seed,
            opts.map.as_str(),
            hud.score,
            hud.wave,
            hud.lives,
            kills,
            waves,
            session.rank()
        );
        Ok(())
    }

    pub fn run_duel(opts: &Options) -> Result<()> {
        let room = MemoryRoom::new();
        let tuning = Tuning::default();
        let mut sessions = Vec::new();
        for (i, name) in ["Alpha", "Bravo"].into_iter().enumerate() {
            let id = format!("bot-{}", name.to_lowercase());
            let (channel, inbox) = room.join(&id)?;
            let net = Multiplayer::connect(id, name, Box::new(channel), inbox, tuning.net.clone());
            let settings = Settings {
                name: name.into(),
                map: opts.map,
                ..Settings::default()
            };
            sessions.push(Session::online(opts.seed, tuning.clone(), settings, net)?);
            log::info!("{} seated in slot {}", name, i);
        }
        let mut bots: Vec<Bot> = (0..sessions.len() as u64)
            .map(|i| Bot::new(opts.seed.wrapping_add(10 + i)))
            .collect();

        'outer: for t in 0..opts.ticks {
            for (session, bot) in sessions.iter_mut().zip(bots.iter_mut()) {
                let size = session.state().tuning.player.size;
                let target = session
                    .net()
                    .and_then(|n| n.remotes().find(|r| r.alive))
                    .map(|r| r.render + Vec2::splat(size / 2.0));
                let input = bot.input(t, target);
                session.step(&input);
                for event in session.take_events() {
                    match event {
                        GameEvent::Eliminated { by } => {
                            log::info!("Eliminated at tick {} by {:?}", t, by)
                        }
                        GameEvent::RoomCleared => {
                            log::info!("Room cleared at tick {}", t);
                            break 'outer;
                        }
                        _ => {}
                    }
                }
            }
        }

        for session in &sessions {
            let hud = session.hud();
            println!(
                "duel {} phase={:?} health={:.0}% kills={} opponents={}",
                session.net().map(|n| n.local_id()).unwrap_or("?"),
                hud.phase,
                hud.health_fraction * 100.0,
                hud.kills,
                hud.opponents
            );
        }
        println!("room hits reported: {}", room.hits()?.len());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = headless::Options::from_args(&args);
    log::info!("Steel Dash (native) starting...");

    let result = if opts.duel {
        headless::run_duel(&opts)
    } else {
        headless::run_solo(&opts)
    };
    if let Err(err) = result {
        log::error!("Headless run failed: {}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start
}
