use catalog::{derive_key, CatalogEngine, Dispatcher, LogCatalog, MemoryCatalog, Movie, SledCatalog};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

fn random_text(rng: &mut SmallRng, max_len: usize) -> String {
    let len = rng.gen_range(1..max_len);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_movies(count: usize) -> Vec<Movie> {
    let mut rng = SmallRng::seed_from_u64(1783);
    (0..count)
        .map(|_| {
            let title = random_text(&mut rng, 40);
            let genre = random_text(&mut rng, 12);
            let director = random_text(&mut rng, 30);
            let year = rng.gen_range(1900..2030).to_string();
            Movie::new(derive_key(&title, &genre, &director, &year), title, genre, director, year)
        })
        .collect()
}

fn key_bench(c: &mut Criterion) {
    c.bench_function("derive_key", |b| {
        b.iter(|| derive_key("Dune", "Sci-Fi", "Denis Villeneuve", "2021"))
    });
}

fn insert_all<E: CatalogEngine>(engine: E, movies: Vec<Movie>) {
    for movie in movies {
        engine.insert(movie).unwrap();
    }
}

fn insert_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_bench");
    let movies = random_movies(100);
    group.bench_function("memory", |b| {
        b.iter_batched(
            || (MemoryCatalog::new(), movies.clone()),
            |(engine, movies)| insert_all(engine, movies),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("log", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let engine = LogCatalog::open(temp_dir.path()).unwrap();
                (engine, movies.clone(), temp_dir)
            },
            |(engine, movies, _temp_dir)| insert_all(engine, movies),
            BatchSize::SmallInput,
        )
    });
    group.bench_function("sled", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let engine = SledCatalog::open(temp_dir.path()).unwrap();
                (engine, movies.clone(), temp_dir)
            },
            |(engine, movies, _temp_dir)| insert_all(engine, movies),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn dispatch_bench(c: &mut Criterion) {
    let dispatcher = Dispatcher::new(MemoryCatalog::new());
    for year in 1900..2000 {
        dispatcher.handle(&format!("1|Movie|Drama|Someone|{}", year));
    }
    let key = derive_key("Movie", "Drama", "Someone", "1950");
    let get = format!("6|{}", key);
    c.bench_function("dispatch_get", |b| b.iter(|| dispatcher.handle(&get).encode()));
    c.bench_function("dispatch_list_summaries", |b| {
        b.iter(|| dispatcher.handle("4").encode())
    });
}

criterion_group!(benches, key_bench, insert_bench, dispatch_bench);
criterion_main!(benches);
