//! # Command Line Interface
//!
//! A thin demo/exercise binary over the `vmufs` library: format a card,
//! list its directory, and import/export files through the container
//! codecs. Not part of the engine itself.

use clap::{arg, Command};
use vmufs::{CopyProtect, FileProperties, FileType, VmuDevice};

fn build_cli() -> Command {
    Command::new("vmufs")
        .about("Inspect and manipulate Sega Dreamcast VMU flash images")
        .subcommand_required(true)
        .subcommand(
            Command::new("format")
                .about("write a fresh Sega stock filesystem to a new image")
                .arg(arg!(-o --out <PATH> "output .vmu/.bin path").required(true)),
        )
        .subcommand(
            Command::new("ls")
                .about("list the files on a card image")
                .arg(arg!(<IMAGE> "path to a .vmu/.bin image")),
        )
        .subcommand(
            Command::new("import")
                .about("import a host file into a card image, writing it back out")
                .arg(arg!(<IMAGE> "path to a .vmu/.bin image"))
                .arg(arg!(<FILE> "host file to import"))
                .arg(arg!(--name <NAME> "12-character VMU file name").required(true))
                .arg(arg!(--game "import as a GAME file instead of DATA")),
        )
        .subcommand(
            Command::new("export")
                .about("export a file from a card image to a host file")
                .arg(arg!(<IMAGE> "path to a .vmu/.bin image"))
                .arg(arg!(<NAME> "file name on the card"))
                .arg(arg!(<OUT> "host file to write")),
        )
        .subcommand(
            Command::new("defrag")
                .about("defragment a card image in place")
                .arg(arg!(<IMAGE> "path to a .vmu/.bin image")),
        )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = build_cli().get_matches();

    if let Some(cmd) = matches.subcommand_matches("format") {
        let out = cmd.get_one::<String>("out").unwrap();
        let mut dev = VmuDevice::new();
        dev.format_default()?;
        dev.export_image_bin(out)?;
        println!("wrote formatted card to {}", out);
        return Ok(());
    }

    if let Some(cmd) = matches.subcommand_matches("ls") {
        let image = cmd.get_one::<String>("IMAGE").unwrap();
        let dev = VmuDevice::load_image_bin(image)?;
        for k in 0..dev.file_count() {
            let (_, entry) = dev.file_at_index(k).expect("k < file_count");
            println!(
                "{:12} {:?} {} blocks",
                entry.name_str(),
                entry.file_type(),
                entry.file_size
            );
        }
        return Ok(());
    }

    if let Some(cmd) = matches.subcommand_matches("import") {
        let image = cmd.get_one::<String>("IMAGE").unwrap();
        let file = cmd.get_one::<String>("FILE").unwrap();
        let name = cmd.get_one::<String>("name").unwrap();
        let game = cmd.get_flag("game");
        let mut dev = VmuDevice::load_image_bin(image)?;
        let data = std::fs::read(file)?;
        dev.file_create(
            &FileProperties {
                file_name: name.clone(),
                file_type: if game { FileType::Game } else { FileType::Data },
                copy_protect: CopyProtect::Ok,
            },
            &data,
        )?;
        dev.export_image_bin(image)?;
        return Ok(());
    }

    if let Some(cmd) = matches.subcommand_matches("export") {
        let image = cmd.get_one::<String>("IMAGE").unwrap();
        let name = cmd.get_one::<String>("NAME").unwrap();
        let out = cmd.get_one::<String>("OUT").unwrap();
        let dev = VmuDevice::load_image_bin(image)?;
        let (_, entry) = dev.dir_find(name).ok_or("file not found")?;
        let mut data = vec![0u8; entry.file_size as usize * vmufs::device::BLOCK_SIZE];
        dev.file_read(&entry, &mut data, 0, true);
        std::fs::write(out, data)?;
        return Ok(());
    }

    if let Some(cmd) = matches.subcommand_matches("defrag") {
        let image = cmd.get_one::<String>("IMAGE").unwrap();
        let mut dev = VmuDevice::load_image_bin(image)?;
        dev.defragment(None)?;
        dev.export_image_bin(image)?;
        return Ok(());
    }

    unreachable!("clap enforces subcommand_required")
}
