use clap::{Parser, Subcommand};
use mcregion::{
    header::present_entries,
    types::RegionPos,
    utils::{hex_digest, read_region_file, region_file_coords},
    ChunkPos, DecodeConfig, Dimension, WorldError, WorldStore,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Minecraft区域文件查看工具 - 解码扇区表、NBT区块数据与子区块调色板索引
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 解码参数配置文件（JSON格式）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志详细程度，可重复（-v, -vv, -vvv）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查看区域文件的扇区表
    Info {
        /// 区域文件路径（r.X.Z.mca）
        #[arg(short, long)]
        file: PathBuf,

        /// 列出每个扇区条目
        #[arg(long)]
        list: bool,
    },

    /// 构建并输出一个区块的标签树
    Chunk {
        /// 区域文件所在目录
        #[arg(short, long)]
        dir: PathBuf,

        /// 维度编号: 0 主世界, -1 下界, 1 末地
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        dimension: i32,

        #[arg(short, long, allow_negative_numbers = true)]
        x: i32,

        #[arg(short, long, allow_negative_numbers = true)]
        z: i32,

        /// 只输出该路径上的标签，例如 "Status" 或 "Heightmaps.WORLD_SURFACE"
        #[arg(short, long)]
        path: Option<String>,

        /// 以JSON格式输出
        #[arg(long)]
        json: bool,
    },

    /// 输出一个子区块的调色板与索引统计
    Section {
        /// 区域文件所在目录
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        dimension: i32,

        #[arg(short, long, allow_negative_numbers = true)]
        x: i32,

        #[arg(short, long, allow_negative_numbers = true)]
        y: i8,

        #[arg(short, long, allow_negative_numbers = true)]
        z: i32,
    },

    /// 解码目录中所有区域文件的全部区块
    Scan {
        /// 区域文件所在目录
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        dimension: i32,
    },
}

fn main() -> Result<(), WorldError> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => DecodeConfig::from_json_file(path)?,
        None => DecodeConfig::default(),
    };

    let result = match &cli.command {
        Commands::Info { file, list } => print_region_info(file, *list),
        Commands::Chunk {
            dir,
            dimension,
            x,
            z,
            path,
            json,
        } => print_chunk(dir, config, Dimension(*dimension), *x, *z, path.as_deref(), *json),
        Commands::Section {
            dir,
            dimension,
            x,
            y,
            z,
        } => print_section(dir, config, Dimension(*dimension), *x, *y, *z),
        Commands::Scan { dir, dimension } => scan_directory(dir, config, Dimension(*dimension)),
    };

    if let Err(e) = &result {
        eprintln!("错误: {}", e);
    }
    result
}

fn region_path(dir: &Path, region: RegionPos) -> PathBuf {
    dir.join(format!("r.{}.{}.mca", region.x, region.z))
}

/// 读取区块所在的区域文件并构建区块
fn load_chunk(
    dir: &Path,
    config: DecodeConfig,
    dimension: Dimension,
    x: i32,
    z: i32,
) -> Result<WorldStore, WorldError> {
    let region = ChunkPos::new(x, z).region_pos();
    let path = region_path(dir, region);
    if !path.exists() {
        return Err(WorldError::RegionNotFound { dimension, region });
    }

    let mut store = WorldStore::with_config(dir.display().to_string(), config);
    let bytes = read_region_file(&path)?;
    store.open_region(dimension, region.x, region.z, &bytes);
    store.build_chunk(dimension, x, z)?;
    Ok(store)
}

fn print_region_info(file: &Path, list: bool) -> Result<(), WorldError> {
    let bytes = read_region_file(file)?;
    let entries = present_entries(&bytes)?;

    println!("=== 区域文件信息 ===");
    println!("文件: {}", file.display());
    match region_file_coords(file) {
        Some(region) => println!("区域坐标: ({}, {})", region.x, region.z),
        None => println!("区域坐标: 未知（文件名不是 r.X.Z.mca）"),
    }
    println!("大小: {} 字节", bytes.len());
    println!("SHA-256: {}", hex_digest(&mcregion::utils::calculate_sha256(&bytes)));
    println!("区块数量: {}", entries.len());

    if list {
        println!("\n=== 扇区表 ===");
        for (x, z, entry) in &entries {
            println!(
                "  ({:2}, {:2})  扇区 {:6}  x{:3}  ({} 字节)",
                x,
                z,
                entry.offset,
                entry.sector_count,
                entry.byte_len()
            );
        }
    }

    Ok(())
}

fn print_chunk(
    dir: &Path,
    config: DecodeConfig,
    dimension: Dimension,
    x: i32,
    z: i32,
    path: Option<&str>,
    json: bool,
) -> Result<(), WorldError> {
    let store = load_chunk(dir, config, dimension, x, z)?;
    let chunk = store.get_chunk(dimension, x, z)?;
    let tag = match path {
        Some(path) => chunk.get_path(path)?,
        None => chunk.root(),
    };

    if json {
        let text = serde_json::to_string_pretty(tag)
            .map_err(|e| WorldError::Config(format!("JSON写入错误: {}", e)))?;
        println!("{}", text);
    } else {
        println!("{}", tag);
    }
    Ok(())
}

fn print_section(
    dir: &Path,
    config: DecodeConfig,
    dimension: Dimension,
    x: i32,
    y: i8,
    z: i32,
) -> Result<(), WorldError> {
    let store = load_chunk(dir, config, dimension, x, z)?;
    let palette = store.palette(dimension, x, y, z)?;
    let entries = palette.as_list().unwrap_or_default();

    println!("=== 子区块 ({}, {}, {}) ===", x, y, z);
    println!("维度: {}", dimension);
    println!("调色板大小: {}", entries.len());
    println!("调色板: {}", palette);

    match store.get_section_view(dimension, x, y, z) {
        Ok(indices) => {
            println!("\n=== 索引统计 ===");
            for (index, count) in indices.histogram(entries.len()).iter().enumerate() {
                println!("  #{:<4} {:5} 个方块", index, count);
            }
        }
        Err(e) if e.is_not_found() => println!("\n均一子区块，没有索引数据"),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn scan_directory(dir: &Path, config: DecodeConfig, dimension: Dimension) -> Result<(), WorldError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(region) = region_file_coords(&path) {
            paths.push((region, path));
        }
    }
    println!("找到 {} 个区域文件", paths.len());

    // 并行读取文件，解码在当前线程中依次进行
    let files: Vec<(RegionPos, Result<Vec<u8>, WorldError>)> = paths
        .par_iter()
        .map(|(region, path)| (*region, read_region_file(path)))
        .collect();

    let mut store = WorldStore::with_config(dir.display().to_string(), config);
    let mut chunks = Vec::new();
    for (region, bytes) in files {
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("无法读取区域 ({}, {}): {}", region.x, region.z, e);
                continue;
            }
        };
        let buffer = store.open_region(dimension, region.x, region.z, &bytes);
        match buffer.present_chunks() {
            Ok(entries) => chunks.extend(
                entries
                    .into_iter()
                    .filter_map(|(ix, iz, _)| region.chunk_at(ix, iz)),
            ),
            Err(e) => log::warn!("区域 ({}, {}) 扇区表无效: {}", region.x, region.z, e),
        }
    }

    let mut failed = 0;
    for chunk in &chunks {
        if let Err(e) = store.build_chunk(dimension, chunk.x, chunk.z) {
            log::warn!("区块 ({}, {}) 构建失败: {}", chunk.x, chunk.z, e);
            failed += 1;
        }
    }

    println!("=== 扫描结果 ===");
    println!("维度: {}", dimension);
    println!("区域: {}", store.region_count(dimension));
    println!("区块: {} 成功, {} 失败", chunks.len() - failed, failed);
    println!("非均一子区块: {}", store.section_count(dimension));
    Ok(())
}
