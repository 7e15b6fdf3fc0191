use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use std::io::Write;

// Reference the main crate
extern crate vfile;

use vfile::{FileConfig, SeekMode, VirtualFile};

const DATA_SIZE: usize = 256 * 1024;
const READ_SIZE: usize = 512;

fn generate_data(length: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..length).map(|_| rng.r#gen::<u8>()).collect()
}

// Sequential reads until EOF, memory vs persistent backing
pub fn bench_sequential_read(c: &mut Criterion) {
    let data = generate_data(DATA_SIZE);
    let mut temp = tempfile::NamedTempFile::new().unwrap();
    temp.write_all(&data).unwrap();
    temp.flush().unwrap();

    let mut group = c.benchmark_group("SequentialRead");

    group.bench_function("memory", |b| {
        b.iter(|| {
            let mut file = VirtualFile::open_from_memory(black_box(&data));
            let mut buf = [0u8; READ_SIZE];
            while file.read(&mut buf) > 0 {}
        })
    });

    group.bench_function("persistent", |b| {
        b.iter(|| {
            let mut file = VirtualFile::open(temp.path(), "rb").unwrap();
            let mut buf = [0u8; READ_SIZE];
            while file.read(&mut buf) > 0 {}
            file.close().unwrap();
        })
    });

    group.finish();
}

// Random seeks followed by a short read
pub fn bench_random_seek(c: &mut Criterion) {
    let data = generate_data(DATA_SIZE);
    let mut temp = tempfile::NamedTempFile::new().unwrap();
    temp.write_all(&data).unwrap();
    temp.flush().unwrap();
    let offsets: Vec<i64> = {
        let mut rng = rand::thread_rng();
        (0..1024).map(|_| rng.gen_range(0..DATA_SIZE as i64)).collect()
    };

    let mut group = c.benchmark_group("RandomSeek");

    group.bench_function("memory", |b| {
        let mut file = VirtualFile::open_from_memory(&data);
        let mut buf = [0u8; 16];
        b.iter(|| {
            for &offset in &offsets {
                file.seek(offset, SeekMode::Start);
                black_box(file.read(&mut buf));
            }
        })
    });

    group.bench_function("persistent", |b| {
        let mut file = VirtualFile::open(temp.path(), "rb").unwrap();
        let mut buf = [0u8; 16];
        b.iter(|| {
            for &offset in &offsets {
                file.seek(offset, SeekMode::Start);
                black_box(file.read(&mut buf));
            }
        })
    });

    group.finish();
}

// Cost of flushing after every write
pub fn bench_write_flush(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bench_write.bin");
    let chunk = generate_data(READ_SIZE);

    let mut group = c.benchmark_group("Write");

    for flush_on_write in [true, false] {
        let config = FileConfig {
            flush_on_write,
            ..FileConfig::default()
        };
        let name = if flush_on_write { "flush_each" } else { "buffered" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut file = VirtualFile::open_with_config(&path, "wb", &config).unwrap();
                for _ in 0..64 {
                    file.write(black_box(&chunk));
                }
                file.close().unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sequential_read, bench_random_seek, bench_write_flush);
criterion_main!(benches);
