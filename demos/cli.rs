use anyhow::Result;
use std::env;
use syno_station::client::{Capability, SynoClientBuilder};
use syno_station::query::ListOptions;
use syno_station::session::LoginRequest;
use syno_station::store::{LoginHistory, MemoryStore, VideoQuality};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let video = env::args().nth(1).as_deref() == Some("video");
    let capability = if video {
        Capability::video_station()
    } else {
        Capability::download_station()
    };
    let client = SynoClientBuilder::from_env()?
        .capability(capability)
        .build()?;
    let cancel = CancellationToken::new();

    let store = MemoryStore::default();
    let history = LoginHistory::new(&store);
    let mut login = LoginRequest::new(
        env::var("SYNOLOGY_USERNAME")?,
        env::var("SYNOLOGY_PASSWORD")?,
    );
    if let Ok(otp) = env::var("SYNOLOGY_OTP") {
        login = login.otp_code(otp);
    }
    let login = history.trusted_login(client.host().as_str(), login)?;

    let session = client.login(&login, &cancel).await?;
    history.remember(client.host().as_str(), login.username(), &session)?;

    if video {
        let quality = VideoQuality::load(&store)?;
        println!("preferred stream format: {}", quality.stream_format());

        let libraries = client.video_station().require_libraries(&cancel).await?;
        for library in &libraries.libraries {
            println!(
                "library: {}, title: {}, kind: {:?}",
                library.id, library.title, library.kind
            );
            let movies = client
                .video_station()
                .list_movies(library.id, &ListOptions::page(0, 20), &cancel)
                .await?;
            for movie in movies.movies {
                println!("  movie: {}, title: {}", movie.id, movie.title);
            }
        }
    } else {
        let tasks = client.download_station().get_tasks(&cancel).await?;
        for task in tasks.task {
            println!(
                "task: {}, title: {}, status: {:?}, size: {}, progress: {}% {} {}",
                task.id,
                task.title,
                task.status,
                task.calculate_size(),
                task.calculate_progress(),
                task.calculate_speed(),
                task.calculate_time_left()
            );
        }
    }

    client.logout(&cancel).await?;
    Ok(())
}
