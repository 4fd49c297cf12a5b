//! 流式命令执行
//!
//! 启动外部工具，并发读取 stdout / stderr，每读到一段输出就同步推送给观察者，
//! 同时累积到最终结果中。两个流都关闭且子进程回收后才产出结果。

use super::aggregate::OutputAccumulator;
use super::types::{ArgumentVector, OperationResult, StreamChunk, StreamKind};
use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

const READ_BUF_SIZE: usize = 8 * 1024;

/// 实时输出的接收方
///
/// 在读取循环中被同步调用，实现方不应阻塞。
pub trait ChunkObserver: Send {
    fn on_chunk(&mut self, chunk: StreamChunk);
}

impl<F> ChunkObserver for F
where
    F: FnMut(StreamChunk) + Send,
{
    fn on_chunk(&mut self, chunk: StreamChunk) {
        self(chunk)
    }
}

/// 将输出转发到 channel（供 UI 线程消费）
#[derive(Debug, Clone)]
pub struct ChannelObserver(pub mpsc::UnboundedSender<StreamChunk>);

impl ChunkObserver for ChannelObserver {
    fn on_chunk(&mut self, chunk: StreamChunk) {
        // 接收端已关闭时只丢弃实时输出，最终结果不受影响
        let _ = self.0.send(chunk);
    }
}

/// 增量 UTF-8 解码：跨读取边界的多字节字符会被保留到下一次
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + len;
                        }
                        // 末尾是不完整的字符，等待后续字节
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        out
    }

    /// 流结束时输出残留字节
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// 子进程运行目录：传入路径的父目录；未传入或没有父目录时使用当前目录
pub fn spawn_directory(working_directory: Option<&Path>) -> Option<&Path> {
    working_directory
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// 单次调用内的输出去向
struct Capture<'a> {
    cmd: &'a ArgumentVector,
    observer: &'a mut dyn ChunkObserver,
    output: OutputAccumulator,
}

impl Capture<'_> {
    fn deliver(&mut self, kind: StreamKind, text: String) {
        if text.is_empty() {
            return;
        }
        self.output.push(kind, &text);
        self.observer.on_chunk(StreamChunk {
            kind,
            cmd: self.cmd.clone(),
            text,
        });
    }

    /// 返回该流是否仍然打开
    fn handle_read(
        &mut self,
        kind: StreamKind,
        decoder: &mut Utf8Decoder,
        read: io::Result<usize>,
        buf: &[u8],
    ) -> bool {
        match read {
            Ok(0) => {
                let tail = decoder.finish();
                self.deliver(kind, tail);
                false
            }
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                self.deliver(kind, text);
                true
            }
            Err(e) => {
                log::warn!("读取 {} {:?} 失败: {}", self.cmd.verb(), kind, e);
                let tail = decoder.finish();
                self.deliver(kind, tail);
                false
            }
        }
    }
}

/// 外部工具执行器
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    verbose: bool,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            program: program.into(),
            verbose,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn log_level(&self) -> log::Level {
        if self.verbose {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }

    /// 运行一次命令
    ///
    /// 只有进程无法启动时返回错误；stderr 输出和非零退出码都作为数据写入结果。
    /// 没有超时，也不会重试。
    pub async fn run(
        &self,
        cmd: &ArgumentVector,
        working_directory: Option<&Path>,
        observer: &mut dyn ChunkObserver,
    ) -> Result<OperationResult> {
        let level = self.log_level();
        let program = self.program.display().to_string();
        log::log!(level, "执行: {} {}", program, cmd);

        let mut command = Command::new(&self.program);
        command
            .args(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = spawn_directory(working_directory) {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| Error::SpawnFailure {
            program: program.clone(),
            source,
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout 未被捕获"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr 未被捕获"))?;

        let mut capture = Capture {
            cmd,
            observer,
            output: OutputAccumulator::new(),
        };
        let mut out_decoder = Utf8Decoder::default();
        let mut err_decoder = Utf8Decoder::default();
        let mut out_buf = vec![0u8; READ_BUF_SIZE];
        let mut err_buf = vec![0u8; READ_BUF_SIZE];
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            tokio::select! {
                read = stdout.read(&mut out_buf), if out_open => {
                    out_open = capture.handle_read(StreamKind::Stdout, &mut out_decoder, read, &out_buf);
                }
                read = stderr.read(&mut err_buf), if err_open => {
                    err_open = capture.handle_read(StreamKind::Stderr, &mut err_decoder, read, &err_buf);
                }
            }
        }

        let exit_code = match child.wait().await {
            Ok(status) => {
                log::log!(level, "子进程退出, 退出码 {:?}", status.code());
                status.code()
            }
            Err(e) => {
                log::warn!("等待 {} 退出失败: {}", program, e);
                None
            }
        };

        log::log!(level, "完成: {} {}", program, cmd);
        Ok(capture.output.finish(cmd.clone(), exit_code))
    }
}
