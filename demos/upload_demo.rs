use std::sync::Arc;
use std::time::Duration;
use uploadflow::config::UploadConfig;
use uploadflow::coordinator::UploadCoordinator;
use uploadflow::random::SeededRandom;
use uploadflow::store::FileStatus;
use uploadflow::transfer::TransferTiming;
use uploadflow::validation::SelectedFile;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("\n📤 UploadFlow - Upload Queue Demo");
    println!("==================================\n");

    let config = UploadConfig::fast().with_timing(
        TransferTiming::default().with_delay(Duration::from_millis(20), Duration::from_millis(40)),
    );
    let coordinator = UploadCoordinator::from_config(&config, Arc::new(SeededRandom::new(7)), false)?;

    // Demo 1: Adding a selection
    println!("📦 Demo 1: Adding Files");
    println!("----------------------------------");
    let report = coordinator
        .add_files(vec![
            SelectedFile::described("holiday.mp4", 2_000_000, "video/mp4"),
            SelectedFile::described("report.pdf", 1_000_000, "application/pdf"),
            SelectedFile::described("notes.txt", 4_096, "text/plain"),
            SelectedFile::described("installer.exe", 10, "application/x-msdownload"),
            SelectedFile::described("archive.zip", 200 * 1024 * 1024, "application/zip"),
        ])
        .await?;

    for record in &report.added {
        println!("✅ Queued {} ({} bytes)", record.name, record.size);
    }
    for error in &report.rejected {
        println!("❌ {error}");
    }
    let session = report
        .session
        .ok_or_else(|| anyhow::anyhow!("no files were accepted"))?;
    println!("   Session: {} ({} files)", session.id, session.total_files);

    // Demo 2: Pause and resume
    println!("\n\n⏸  Demo 2: Pause and Resume");
    println!("----------------------------------");
    tokio::time::sleep(Duration::from_millis(150)).await;
    let video = report.added[0].id.clone();
    match coordinator.pause(&video).await? {
        Some(paused) => println!("⏸  Paused {} at {}%", paused.name, paused.progress),
        None => println!("   {} finished before it could be paused", report.added[0].name),
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    coordinator.resume(&video).await?;
    println!("▶️  Resumed {}", report.added[0].name);

    // Demo 3: Cancel
    println!("\n\n🛑 Demo 3: Cancel");
    println!("----------------------------------");
    let notes = report.added[2].id.clone();
    let cancelled = coordinator.cancel(&notes).await?;
    println!("   {} is now {} at {}%", cancelled.name, cancelled.status, cancelled.progress);

    // Demo 4: Watching progress
    println!("\n\n📈 Demo 4: Progress");
    println!("----------------------------------");
    loop {
        let snapshot = coordinator.progress_snapshot();
        if snapshot.is_empty() {
            break;
        }
        for file in &snapshot {
            println!("   {:<12} {:>3}%", file.name, file.progress);
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    // Demo 5: Statistics
    println!("\n\n📊 Demo 5: Statistics");
    println!("----------------------------------");
    let stats = coordinator.stats().await;
    println!("   Files: {} ({} completed)", stats.total_files, stats.completed_files);
    println!("   Total size: {} bytes", stats.total_size);

    if let Some(session_stats) = coordinator.sessions().get_session_stats(&session.id).await {
        println!(
            "   Session completion: {:.0}% in {}s",
            session_stats.completion_rate, session_stats.duration
        );
    }

    let remaining = coordinator.clear_completed().await;
    println!("   Cleared completed files, {remaining} remaining");

    for record in coordinator.files().get_all().await {
        if record.status != FileStatus::Completed {
            println!("   {} left as {}", record.name, record.status);
        }
    }

    println!("\n✨ Demo complete!\n");
    Ok(())
}
