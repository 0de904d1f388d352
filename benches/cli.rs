use std::collections::VecDeque;

use criterion::{Criterion, Throughput};
use libcli::cli::{Cli, CliIo, Command, CommandTable, Config, Error, Port};
use libcli::nvm::RamNvm;
use libcli::osci::{self, Osci, OsciEnv, State};
use libcli::param::{
    self, ParamAccess, ParamEnv, ParamError, ParamInfo, ParamStore, ParamValue,
    watch::LiveWatch,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Default)]
struct BenchPort {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl Port for BenchPort {
    fn transmit(&mut self, data: &[u8]) -> Result<(), Error> {
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<u8>, Error> {
        Ok(self.rx.pop_front())
    }

    fn now_ms(&mut self) -> u32 {
        0
    }
}

const INFO: ParamInfo = ParamInfo {
    id: 12,
    name: "current",
    unit: "A",
    desc: "Motor current",
    group: None,
    def: ParamValue::F32(0.0),
    min: ParamValue::F32(-100.0),
    max: ParamValue::F32(100.0),
    access: ParamAccess::ReadWrite,
    persistent: false,
};

struct BenchStore {
    value: f32,
}

impl ParamStore for BenchStore {
    fn len(&self) -> usize {
        1
    }

    fn info_at(&self, idx: usize) -> Option<&ParamInfo> {
        (idx == 0).then_some(&INFO)
    }

    fn index_of(&self, id: u16) -> Option<usize> {
        (id == 12).then_some(0)
    }

    fn get(&self, id: u16) -> Result<ParamValue, ParamError> {
        if id == 12 {
            Ok(ParamValue::F32(self.value))
        } else {
            Err(ParamError::UnknownId)
        }
    }

    fn set(&mut self, id: u16, value: ParamValue) -> Result<(), ParamError> {
        if id != 12 {
            return Err(ParamError::UnknownId);
        }
        self.value = value.as_f32();
        Ok(())
    }

    fn set_default(&mut self, id: u16) -> Result<(), ParamError> {
        self.set(id, INFO.def)
    }

    fn set_default_all(&mut self) {
        self.value = 0.0;
    }
}

struct App {
    store: BenchStore,
    watch: LiveWatch,
    osci: Osci,
    nvm: RamNvm<64>,
}

impl App {
    fn new() -> Self {
        Self {
            store: BenchStore { value: 0.0 },
            watch: LiveWatch::new(10),
            osci: Osci::new(),
            nvm: RamNvm::new(),
        }
    }
}

impl ParamEnv for App {
    type Store = BenchStore;
    type Nvm = RamNvm<64>;

    fn params(&self) -> &BenchStore {
        &self.store
    }

    fn params_mut(&mut self) -> &mut BenchStore {
        &mut self.store
    }

    fn watch(&self) -> &LiveWatch {
        &self.watch
    }

    fn watch_mut(&mut self) -> &mut LiveWatch {
        &mut self.watch
    }

    fn nvm(&mut self) -> Option<&mut RamNvm<64>> {
        Some(&mut self.nvm)
    }
}

impl OsciEnv for App {
    fn osci(&self) -> &Osci {
        &self.osci
    }

    fn osci_mut(&mut self) -> &mut Osci {
        &mut self.osci
    }
}

fn noop(_io: &mut CliIo<'_>, _env: &mut App, _attr: Option<&str>) -> Result<(), Error> {
    Ok(())
}

static USER_CMDS: [Command<App>; 2] = [
    Command {
        name: "noop",
        help: "Do nothing",
        handler: noop,
    },
    Command {
        name: "noop_arg",
        help: "Do nothing with an attribute",
        handler: noop,
    },
];
static USER_TABLE: CommandTable<'static, App> = CommandTable::new("bench", &USER_CMDS);

static PAR_CMDS: [Command<App>; 6] = param::commands::<App>();
static PAR_TABLE: CommandTable<'static, App> = CommandTable::new("par", &PAR_CMDS);

static OSCI_CMDS: [Command<App>; 8] = osci::commands::<App>();
static OSCI_TABLE: CommandTable<'static, App> = CommandTable::new("osci", &OSCI_CMDS);

fn setup() -> (Cli<'static, BenchPort, App>, App) {
    let mut cli = Cli::new(BenchPort::default(), Config::default());
    cli.init().expect("init");
    cli.register(&USER_TABLE).expect("register");
    cli.register(&PAR_TABLE).expect("register");
    cli.register(&OSCI_TABLE).expect("register");
    cli.port_mut().tx.clear();
    (cli, App::new())
}

fn run_line(cli: &mut Cli<'static, BenchPort, App>, app: &mut App, line: &str) {
    cli.port_mut().rx.extend(line.as_bytes());
    cli.port_mut().rx.extend(b"\r\n");
    cli.handle(app).expect("handle");
    cli.port_mut().tx.clear();
}

pub fn bench_dispatch(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let pool = ["noop", "noop_arg 123", "sw_ver", "par_get 12"];
    let lines: Vec<&str> = (0..64).map(|_| pool[rng.gen_range(0..pool.len())]).collect();
    let bytes: usize = lines.iter().map(|l| l.len() + 2).sum();

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("dispatch", |b| {
        b.iter_batched_ref(
            setup,
            |(cli, app)| {
                for line in &lines {
                    run_line(cli, app, line);
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_par_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("par_get");
    group.bench_function("par_get", |b| {
        b.iter_batched_ref(
            setup,
            |(cli, app)| {
                run_line(cli, app, "par_get 12");
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_osci_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("osci_sample");
    group.bench_function("capture", |b| {
        b.iter_batched_ref(
            || {
                let (mut cli, mut app) = setup();
                run_line(&mut cli, &mut app, "osci_channel 12");
                run_line(&mut cli, &mut app, "osci_start");
                app
            },
            |app| {
                let App { store, osci, .. } = app;
                while osci.state() != State::Done {
                    store.value += 1.0;
                    osci.sample(store);
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}
