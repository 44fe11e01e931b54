//! 资源存储模块
//!
//! 以统一接口访问容器中的文件字节，支持三种存储形态：
//! ZIP压缩档、未压缩目录以及内存中的虚拟容器。
//! 读取不做缓存，每次访问都会重新打开底层存储。

use crate::epub::error::Result;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// 资源存储后端
#[derive(Debug)]
pub enum AssetStore {
    /// ZIP压缩档(EPUB文件)
    Archive(PathBuf),
    /// 未压缩目录
    Directory(PathBuf),
    /// 内存中的虚拟容器
    Memory(HashMap<String, Vec<u8>>),
}

impl AssetStore {
    /// 读取指定内部路径的文件内容
    ///
    /// # 参数
    /// * `internal_path` - 相对容器根的规范内部路径
    ///
    /// # 返回值
    /// * `Result<Option<Vec<u8>>>` - 文件内容，文件不存在时返回`None`
    pub fn read(&self, internal_path: &str) -> Result<Option<Vec<u8>>> {
        match self {
            AssetStore::Archive(path) => {
                let file = File::open(path)?;
                let mut archive = ZipArchive::new(file)?;
                match archive.by_name(internal_path) {
                    Ok(mut entry) => {
                        let mut buffer = Vec::new();
                        entry.read_to_end(&mut buffer)?;
                        Ok(Some(buffer))
                    }
                    Err(zip::result::ZipError::FileNotFound) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            AssetStore::Directory(path) => {
                let full_path = path.join(internal_path);
                if full_path.is_file() {
                    Ok(Some(fs::read(full_path)?))
                } else {
                    Ok(None)
                }
            }
            AssetStore::Memory(files) => Ok(files.get(internal_path).cloned()),
        }
    }

    /// 计算容器的总字节大小
    ///
    /// 压缩档为档案文件本身的大小，目录为其中所有文件大小的递归总和，
    /// 内存容器没有大小概念，返回`None`。
    pub fn size(&self) -> Option<u64> {
        match self {
            AssetStore::Archive(path) => fs::metadata(path).ok().map(|metadata| metadata.len()),
            AssetStore::Directory(path) => Some(directory_size(path)),
            AssetStore::Memory(_) => None,
        }
    }
}

/// 递归计算目录下所有文件的大小总和
fn directory_size(path: &Path) -> u64 {
    let mut total = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                total += directory_size(&entry_path);
            } else if let Ok(metadata) = entry.metadata() {
                total += metadata.len();
            }
        }
    }
    total
}
