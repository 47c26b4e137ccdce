use clap::{Parser, Subcommand};
use evmlite::{disasm, opcodes, Config, Evm, ExecutionResult, Storage};
use primitive_types::{H160, U256};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "evmlite", about = "Minimal EVM bytecode interpreter CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run EVM bytecode
    Run {
        /// Hex bytecode (e.g., 0x6001600101) or @file
        code: String,
        /// Calldata as hex
        #[arg(long, default_value = "0x")]
        calldata: String,
        /// Caller address (0x..)
        #[arg(long)]
        caller: Option<String>,
        /// Executing account address (0x..)
        #[arg(long)]
        address: Option<String>,
        /// Call value (0x.. or decimal)
        #[arg(long, default_value = "0x0")]
        value: String,
        /// Storage JSON file to preload ({"0x..": "0x.."})
        #[arg(long)]
        storage: Option<String>,
        /// Dump final storage JSON to stdout or @file
        #[arg(long)]
        dump_storage: Option<Option<String>>,
        /// Print full stack
        #[arg(long)]
        dump_stack: bool,
        /// Step ceiling (0 = unbounded)
        #[arg(long, default_value_t = 10_000_000)]
        max_steps: usize,
    },
    /// Run init code, capture its RETURN output as runtime code
    Deploy {
        /// Hex init bytecode or @file
        code: String,
        /// Constructor calldata as hex
        #[arg(long, default_value = "0x")]
        calldata: String,
        /// Caller address (0x..)
        #[arg(long)]
        caller: Option<String>,
        /// After deploying, call the runtime code with this hex calldata,
        /// sharing the same storage
        #[arg(long)]
        call: Option<String>,
        /// Storage JSON file to preload
        #[arg(long)]
        storage: Option<String>,
        /// Dump final storage JSON to stdout or @file
        #[arg(long)]
        dump_storage: Option<Option<String>>,
        /// Step ceiling (0 = unbounded)
        #[arg(long, default_value_t = 10_000_000)]
        max_steps: usize,
    },
    /// Disassemble bytecode
    Disasm {
        /// Hex bytecode or @file
        code: String,
    },
    /// Step-through trace
    Trace {
        /// Hex bytecode or @file
        code: String,
        /// Calldata as hex
        #[arg(long, default_value = "0x")]
        calldata: String,
        /// Max steps
        #[arg(long, default_value_t = 10_000)]
        max_steps: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Run {
            code,
            calldata,
            caller,
            address,
            value,
            storage,
            dump_storage,
            dump_stack,
            max_steps,
        } => run_cmd(
            &code,
            &calldata,
            caller.as_deref(),
            address.as_deref(),
            &value,
            storage.as_deref(),
            dump_storage,
            dump_stack,
            max_steps,
        ),
        Cmd::Deploy {
            code,
            calldata,
            caller,
            call,
            storage,
            dump_storage,
            max_steps,
        } => deploy_cmd(
            &code,
            &calldata,
            caller.as_deref(),
            call.as_deref(),
            storage.as_deref(),
            dump_storage,
            max_steps,
        ),
        Cmd::Disasm { code } => disasm_cmd(&code),
        Cmd::Trace {
            code,
            calldata,
            max_steps,
        } => trace_cmd(&code, &calldata, max_steps),
    }
}

fn build_config(
    calldata_hex: &str,
    caller_hex: Option<&str>,
    address_hex: Option<&str>,
    value_str: &str,
    max_steps: usize,
) -> Config {
    let mut cfg = Config {
        calldata: parse_hex(calldata_hex).unwrap_or_else(|| die("Invalid calldata hex")),
        max_steps: if max_steps == 0 { None } else { Some(max_steps) },
        ..Config::default()
    };
    if let Some(c) = caller_hex {
        cfg.caller = parse_h160(c).unwrap_or_else(|| die("Invalid --caller"));
    }
    if let Some(a) = address_hex {
        cfg.address = parse_h160(a).unwrap_or_else(|| die("Invalid --address"));
    }
    cfg.callvalue = parse_u256(value_str).unwrap_or_else(|| die("Invalid --value"));
    cfg
}

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    code_arg: &str,
    calldata_hex: &str,
    caller_hex: Option<&str>,
    address_hex: Option<&str>,
    value_str: &str,
    storage_path: Option<&str>,
    dump_storage: Option<Option<String>>,
    dump_stack: bool,
    max_steps: usize,
) {
    let code = read_code_arg(code_arg);
    let cfg = build_config(calldata_hex, caller_hex, address_hex, value_str, max_steps);
    let mut evm = Evm::new(code, cfg);
    if let Some(path) = storage_path {
        evm.storage = load_storage(path);
    }
    let result = evm.run();
    match result {
        ExecutionResult::Halted { output } => {
            println!("halted: {}", halt_status(&evm));
            if !output.is_empty() {
                println!("return: 0x{}", hex(&output));
            }
            println!("pc: {}", evm.pc);
            println!("stack size: {}", evm.stack.len());
            if let Some(top) = evm.stack.last() {
                println!("top: 0x{:x}", top);
            }
            if dump_stack {
                for (i, v) in evm.stack.as_slice().iter().rev().enumerate() {
                    println!("[{}] 0x{:x}", i, v);
                }
            }
            write_storage_dump(&evm.storage, dump_storage);
        }
        ExecutionResult::Reverted { output } => {
            println!("reverted: 0x{}", hex(&output));
            write_storage_dump(&evm.storage, dump_storage);
        }
        ExecutionResult::Failed { error, pc } => {
            die(&format!("Execution error: {error} at pc={pc}"))
        }
    }
}

fn deploy_cmd(
    code_arg: &str,
    calldata_hex: &str,
    caller_hex: Option<&str>,
    call_hex: Option<&str>,
    storage_path: Option<&str>,
    dump_storage: Option<Option<String>>,
    max_steps: usize,
) {
    let init_code = read_code_arg(code_arg);
    let cfg = build_config(calldata_hex, caller_hex, None, "0x0", max_steps);
    let mut evm = Evm::new(init_code, cfg.clone());
    if let Some(path) = storage_path {
        evm.storage = load_storage(path);
    }
    let runtime = match evm.run() {
        ExecutionResult::Halted { output } => output,
        ExecutionResult::Reverted { output } => {
            die(&format!("Init code reverted: 0x{}", hex(&output)))
        }
        ExecutionResult::Failed { error, pc } => {
            die(&format!("Init code failed: {error} at pc={pc}"))
        }
    };
    println!("runtime: 0x{}", hex(&runtime));

    if let Some(call_data) = call_hex {
        // The deployed code runs against the storage the init run produced.
        let call_cfg = Config {
            calldata: parse_hex(call_data).unwrap_or_else(|| die("Invalid --call hex")),
            ..cfg
        };
        let mut runtime_evm = Evm::new(runtime, call_cfg);
        runtime_evm.storage = evm.storage;
        match runtime_evm.run() {
            ExecutionResult::Halted { output } => {
                println!("call halted: {}", halt_status(&runtime_evm));
                if !output.is_empty() {
                    println!("call return: 0x{}", hex(&output));
                }
            }
            ExecutionResult::Reverted { output } => {
                println!("call reverted: 0x{}", hex(&output));
            }
            ExecutionResult::Failed { error, pc } => {
                die(&format!("Call failed: {error} at pc={pc}"))
            }
        }
        write_storage_dump(&runtime_evm.storage, dump_storage);
    } else {
        write_storage_dump(&evm.storage, dump_storage);
    }
}

fn disasm_cmd(code_arg: &str) {
    let code = read_code_arg(code_arg);
    for line in disasm::disassemble(&code) {
        println!("{}", line);
    }
}

fn trace_cmd(code_arg: &str, calldata_hex: &str, max_steps: usize) {
    let code = read_code_arg(code_arg);
    let cfg = build_config(calldata_hex, None, None, "0x0", max_steps);
    let mut evm = Evm::new(code, cfg);

    while evm.halted.is_none() {
        if evm.pc >= evm.code.len() {
            break;
        }
        let op = evm.code[evm.pc];
        println!(
            "pc={:04x} op=0x{:02x} {:12} stack={:2} top={}",
            evm.pc,
            op,
            opcodes::name(op).unwrap_or("?"),
            evm.stack.len(),
            evm.stack
                .last()
                .map(|v| format!("0x{:x}", v))
                .unwrap_or_else(|| "-".to_string()),
        );
        if let Err(e) = evm.step() {
            die(&format!("step error: {e} at pc={}", evm.pc));
        }
    }
    println!("-- halt: {} --", halt_status(&evm));
    if !evm.return_data.is_empty() {
        println!("return: 0x{}", hex(&evm.return_data));
    }
}

fn halt_status(evm: &Evm) -> &'static str {
    match &evm.halted {
        Some(evmlite::Halt::Stop) => "STOP",
        Some(evmlite::Halt::Return) => "RETURN",
        Some(evmlite::Halt::Revert) => "REVERT",
        None => {
            if evm.pc >= evm.code.len() {
                "EOF"
            } else {
                "RUNNING"
            }
        }
    }
}

fn write_storage_dump(storage: &Storage, dump: Option<Option<String>>) {
    let Some(target) = dump else { return };
    let json = storage_to_json(storage);
    match target.as_deref().and_then(|t| t.strip_prefix('@')) {
        Some(path) => {
            std::fs::write(path, json).unwrap_or_else(|e| die(&format!("write storage: {e}")))
        }
        None => println!("{}", json),
    }
}

fn storage_to_json(storage: &Storage) -> String {
    let mut slots = serde_json::Map::new();
    for (k, v) in storage.iter() {
        slots.insert(
            format!("0x{:x}", k),
            serde_json::Value::String(format!("0x{:x}", v)),
        );
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(slots)).unwrap()
}

fn load_storage(path: &str) -> Storage {
    let txt =
        std::fs::read_to_string(path).unwrap_or_else(|e| die(&format!("read storage: {e}")));
    let v: serde_json::Value =
        serde_json::from_str(&txt).unwrap_or_else(|e| die(&format!("parse storage json: {e}")));
    let mut storage = Storage::new();
    let Some(slots) = v.as_object() else {
        die("storage json must be an object of hex key/value pairs")
    };
    for (k, val) in slots {
        let key = parse_u256(k).unwrap_or_else(|| die("invalid storage key"));
        let value = val
            .as_str()
            .and_then(parse_u256)
            .unwrap_or_else(|| die("invalid storage value"));
        storage.store(key, value);
    }
    storage
}

fn read_code_arg(arg: &str) -> Vec<u8> {
    if let Some(rest) = arg.strip_prefix('@') {
        std::fs::read(rest).unwrap_or_else(|e| die(&format!("Failed to read file: {e}")))
    } else {
        parse_hex(arg).unwrap_or_else(|| die("Invalid code hex"))
    }
}

fn parse_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Some(Vec::new());
    }
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn parse_h160(s: &str) -> Option<H160> {
    let b = parse_hex(s)?;
    if b.len() != 20 {
        return None;
    }
    Some(H160::from_slice(&b))
}

fn parse_u256(s: &str) -> Option<U256> {
    let s = s.trim();
    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        // Accept minimal-width hex like 0x1.
        let padded = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let b = parse_hex(&padded)?;
        if b.len() > 32 {
            return None;
        }
        let mut buf = [0u8; 32];
        buf[32 - b.len()..].copy_from_slice(&b);
        Some(U256::from_big_endian(&buf))
    } else {
        s.parse::<u128>().ok().map(U256::from)
    }
}

fn die(msg: &str) -> ! {
    eprintln!("{}", msg);
    std::process::exit(2);
}
